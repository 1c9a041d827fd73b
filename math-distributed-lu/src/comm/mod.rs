//! Communication layer between the root and the workers
//!
//! The elimination rounds only need two primitives: a one-to-many broadcast of
//! the pivot row, and ordered directed channels between the root and each
//! worker. Both are blocking from the caller's point of view.
//!
//! Backends:
//! - [`LocalComm`]: one thread per participant, `std::sync::mpsc` channels
//! - [`MpiComm`]: one MPI process per participant (`mpi` feature)
//! - [`TracedComm`]: wraps another backend and records every protocol event

mod local;
#[cfg(feature = "mpi")]
mod mpi_comm;
mod trace;

pub use local::{LocalComm, local_group, local_group_bounded};
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;
pub use trace::{ProtocolTrace, TraceEvent, TracedComm};

use crate::error::Result;
use crate::protocol::{RootMessage, WorkerReply};

/// Rank of the coordinating participant.
pub const ROOT_RANK: usize = 0;

/// Blocking message passing between one root and `size - 1` workers.
///
/// Messages between a given (root, worker) pair are delivered in send order.
pub trait Communicator {
    /// Rank of this participant; [`ROOT_RANK`] for the root, `1..size` for workers.
    fn rank(&self) -> usize;

    /// Number of participants, root included.
    fn size(&self) -> usize;

    /// Number of participants besides the root.
    fn workers(&self) -> usize {
        self.size().saturating_sub(1)
    }

    fn is_root(&self) -> bool {
        self.rank() == ROOT_RANK
    }

    /// Broadcast from the root: the root sends `row`, every worker overwrites
    /// its `row` with the root's values. Lengths must agree on all ranks.
    fn broadcast(&self, row: &mut [f64]) -> Result<()>;

    /// Root only: directed send to `worker`.
    fn send_to_worker(&self, worker: usize, message: RootMessage) -> Result<()>;

    /// Worker only: next directed message from the root.
    fn recv_from_root(&self) -> Result<RootMessage>;

    /// Worker only: directed send to the root.
    fn send_to_root(&self, reply: WorkerReply) -> Result<()>;

    /// Root only: next directed message from `worker`.
    fn recv_from_worker(&self, worker: usize) -> Result<WorkerReply>;
}
