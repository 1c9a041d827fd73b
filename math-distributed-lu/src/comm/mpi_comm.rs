//! MPI backend: every participant is an MPI process of `MPI_COMM_WORLD`
//!
//! Directed messages are `f64` frames from [`crate::protocol::wire`],
//! discriminated by MPI tag. Row counts travel as a one-slot frame.

use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::{Communicator as _, Destination, Root, Source};
use mpi::Tag;

use super::{Communicator, ROOT_RANK};
use crate::error::{LuError, Result};
use crate::protocol::{RootMessage, WorkerReply, wire};

const WORK_TAG: Tag = 0;
const END_OF_ROUND_TAG: Tag = 1;
const COUNT_TAG: Tag = 2;
const BATCH_TAG: Tag = 3;

/// Participant of an MPI process group.
pub struct MpiComm {
    world: SimpleCommunicator,
    rank: usize,
    size: usize,
    // dropped last: finalizes MPI
    _universe: Universe,
}

impl MpiComm {
    /// Initialize MPI and join `MPI_COMM_WORLD`.
    pub fn initialize() -> Result<Self> {
        let universe = mpi::initialize()
            .ok_or_else(|| LuError::Bootstrap("MPI is already initialized".to_string()))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        log::debug!("MPI rank {rank} of {size} up");
        Ok(Self {
            world,
            rank,
            size,
            _universe: universe,
        })
    }

    /// Tear down the whole process group.
    pub fn abort(&self, code: i32) -> ! {
        self.world.abort(code)
    }

    fn check_root(&self, operation: &'static str) -> Result<()> {
        if self.rank == ROOT_RANK {
            Ok(())
        } else {
            Err(LuError::WrongRole {
                rank: self.rank,
                operation,
            })
        }
    }

    fn check_worker(&self, operation: &'static str) -> Result<()> {
        if self.rank == ROOT_RANK {
            Err(LuError::WrongRole {
                rank: self.rank,
                operation,
            })
        } else {
            Ok(())
        }
    }

    fn check_peer(&self, worker: usize) -> Result<()> {
        if worker == ROOT_RANK || worker >= self.size {
            return Err(LuError::Disconnected { peer: worker });
        }
        Ok(())
    }
}

fn tag_kind(tag: Tag) -> &'static str {
    match tag {
        WORK_TAG => "work row",
        END_OF_ROUND_TAG => "end of round",
        COUNT_TAG => "row count",
        BATCH_TAG => "row batch",
        _ => "unknown tag",
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast(&self, row: &mut [f64]) -> Result<()> {
        self.world
            .process_at_rank(ROOT_RANK as i32)
            .broadcast_into(row);
        Ok(())
    }

    fn send_to_worker(&self, worker: usize, message: RootMessage) -> Result<()> {
        self.check_root("send to a worker")?;
        self.check_peer(worker)?;
        let process = self.world.process_at_rank(worker as i32);
        match message {
            RootMessage::Work(row) => {
                process.send_with_tag(&wire::encode_work_row(&row)[..], WORK_TAG);
            }
            RootMessage::EndOfRound => {
                process.send_with_tag(&[0.0_f64][..], END_OF_ROUND_TAG);
            }
        }
        Ok(())
    }

    fn recv_from_root(&self) -> Result<RootMessage> {
        self.check_worker("receive from the root")?;
        let (frame, status) = self
            .world
            .process_at_rank(ROOT_RANK as i32)
            .receive_vec::<f64>();
        match status.tag() {
            WORK_TAG => Ok(RootMessage::Work(wire::decode_work_row(frame)?)),
            END_OF_ROUND_TAG => Ok(RootMessage::EndOfRound),
            tag => Err(LuError::ProtocolViolation {
                rank: self.rank,
                expected: "work row or end of round",
                got: tag_kind(tag),
            }),
        }
    }

    fn send_to_root(&self, reply: WorkerReply) -> Result<()> {
        self.check_worker("send to the root")?;
        let root = self.world.process_at_rank(ROOT_RANK as i32);
        match reply {
            WorkerReply::Count(count) => {
                root.send_with_tag(&wire::encode_count(count)[..], COUNT_TAG)
            }
            WorkerReply::Batch(batch) => {
                root.send_with_tag(&wire::encode_batch(&batch)[..], BATCH_TAG)
            }
        }
        Ok(())
    }

    fn recv_from_worker(&self, worker: usize) -> Result<WorkerReply> {
        self.check_root("receive from a worker")?;
        self.check_peer(worker)?;
        let (frame, status) = self
            .world
            .process_at_rank(worker as i32)
            .receive_vec::<f64>();
        match status.tag() {
            COUNT_TAG => Ok(WorkerReply::Count(wire::decode_count(&frame)?)),
            BATCH_TAG => Ok(WorkerReply::Batch(wire::decode_batch(&frame)?)),
            tag => Err(LuError::ProtocolViolation {
                rank: self.rank,
                expected: "row count or row batch",
                got: tag_kind(tag),
            }),
        }
    }
}
