//! In-process backend: every participant is a thread
//!
//! Each worker has one downlink from the root, shared by broadcast and directed
//! frames so that ordering between them is the send order, and one uplink back
//! to the root. Channels made by [`local_group`] are rendezvous channels: a send
//! returns only once the peer has taken the message. Dropping a participant
//! closes its channels, which turns a blocked peer's send or receive into
//! [`LuError::Disconnected`].

use std::sync::mpsc::{self, Receiver, SyncSender};

use super::{Communicator, ROOT_RANK};
use crate::error::{LuError, Result};
use crate::protocol::{RootMessage, WorkerReply};

#[derive(Debug)]
enum Frame {
    Broadcast(Vec<f64>),
    Direct(RootMessage),
}

impl Frame {
    fn kind(&self) -> &'static str {
        match self {
            Frame::Broadcast(_) => "broadcast",
            Frame::Direct(message) => message.kind(),
        }
    }
}

#[derive(Debug)]
enum Links {
    Root {
        downlinks: Vec<SyncSender<Frame>>,
        uplinks: Vec<Receiver<WorkerReply>>,
    },
    Worker {
        downlink: Receiver<Frame>,
        uplink: SyncSender<WorkerReply>,
    },
}

/// One participant of an in-process group created by [`local_group`].
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    links: Links,
}

/// Create a root and `workers` workers wired to it, ordered by rank.
pub fn local_group(workers: usize) -> Result<Vec<LocalComm>> {
    local_group_bounded(workers, 0)
}

/// Like [`local_group`], but every channel buffers up to `capacity` messages
/// before a send blocks. `0` gives rendezvous channels.
pub fn local_group_bounded(workers: usize, capacity: usize) -> Result<Vec<LocalComm>> {
    if workers == 0 {
        return Err(LuError::TooFewWorkers { workers });
    }
    let size = workers + 1;

    let mut downlinks = Vec::with_capacity(workers);
    let mut uplinks = Vec::with_capacity(workers);
    let mut group = Vec::with_capacity(size);
    group.push(None);

    for rank in 1..size {
        let (down_tx, down_rx) = mpsc::sync_channel(capacity);
        let (up_tx, up_rx) = mpsc::sync_channel(capacity);
        downlinks.push(down_tx);
        uplinks.push(up_rx);
        group.push(Some(LocalComm {
            rank,
            size,
            links: Links::Worker {
                downlink: down_rx,
                uplink: up_tx,
            },
        }));
    }

    group[ROOT_RANK] = Some(LocalComm {
        rank: ROOT_RANK,
        size,
        links: Links::Root { downlinks, uplinks },
    });

    Ok(group.into_iter().flatten().collect())
}

impl LocalComm {
    fn wrong_role(&self, operation: &'static str) -> LuError {
        LuError::WrongRole {
            rank: self.rank,
            operation,
        }
    }

    fn downlink_to(&self, worker: usize) -> Result<&SyncSender<Frame>> {
        match &self.links {
            Links::Root { downlinks, .. } => worker
                .checked_sub(1)
                .and_then(|slot| downlinks.get(slot))
                .ok_or(LuError::Disconnected { peer: worker }),
            Links::Worker { .. } => Err(self.wrong_role("send to a worker")),
        }
    }

    fn recv_frame(&self) -> Result<Frame> {
        match &self.links {
            Links::Worker { downlink, .. } => downlink
                .recv()
                .map_err(|_| LuError::Disconnected { peer: ROOT_RANK }),
            Links::Root { .. } => Err(self.wrong_role("receive from the root")),
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast(&self, row: &mut [f64]) -> Result<()> {
        if let Links::Root { downlinks, .. } = &self.links {
            for (slot, downlink) in downlinks.iter().enumerate() {
                downlink
                    .send(Frame::Broadcast(row.to_vec()))
                    .map_err(|_| LuError::Disconnected { peer: slot + 1 })?;
            }
            return Ok(());
        }

        match self.recv_frame()? {
            Frame::Broadcast(values) if values.len() == row.len() => {
                row.copy_from_slice(&values);
                Ok(())
            }
            Frame::Broadcast(values) => Err(LuError::RowLength {
                expected: row.len(),
                got: values.len(),
            }),
            frame => Err(LuError::ProtocolViolation {
                rank: self.rank,
                expected: "broadcast",
                got: frame.kind(),
            }),
        }
    }

    fn send_to_worker(&self, worker: usize, message: RootMessage) -> Result<()> {
        self.downlink_to(worker)?
            .send(Frame::Direct(message))
            .map_err(|_| LuError::Disconnected { peer: worker })
    }

    fn recv_from_root(&self) -> Result<RootMessage> {
        match self.recv_frame()? {
            Frame::Direct(message) => Ok(message),
            frame => Err(LuError::ProtocolViolation {
                rank: self.rank,
                expected: "work row or end of round",
                got: frame.kind(),
            }),
        }
    }

    fn send_to_root(&self, reply: WorkerReply) -> Result<()> {
        match &self.links {
            Links::Worker { uplink, .. } => uplink
                .send(reply)
                .map_err(|_| LuError::Disconnected { peer: ROOT_RANK }),
            Links::Root { .. } => Err(self.wrong_role("send to the root")),
        }
    }

    fn recv_from_worker(&self, worker: usize) -> Result<WorkerReply> {
        match &self.links {
            Links::Root { uplinks, .. } => worker
                .checked_sub(1)
                .and_then(|slot| uplinks.get(slot))
                .ok_or(LuError::Disconnected { peer: worker })?
                .recv()
                .map_err(|_| LuError::Disconnected { peer: worker }),
            Links::Worker { .. } => Err(self.wrong_role("receive from a worker")),
        }
    }
}
