//! Protocol recorder
//!
//! [`TracedComm`] forwards every call to the wrapped communicator and appends
//! what happened to a [`ProtocolTrace`] shared by all participants. Events of
//! a single participant appear in the order that participant performed them.

use std::sync::Arc;

use parking_lot::Mutex;

use super::Communicator;
use crate::error::Result;
use crate::protocol::{RootMessage, WorkerReply};

/// One completed communication step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// Root sent, or a worker received, a pivot row of `len` values.
    Broadcast { rank: usize, len: usize },
    SendWork { to: usize, ordinal: usize },
    SendEndOfRound { to: usize },
    RecvWork { rank: usize, ordinal: usize },
    RecvEndOfRound { rank: usize },
    SendCount { rank: usize, count: usize },
    SendBatch { rank: usize, rows: usize },
    RecvCount { from: usize, count: usize },
    RecvBatch { from: usize, rows: usize },
}

impl TraceEvent {
    /// Participant that performed the step.
    pub fn actor(&self) -> usize {
        match *self {
            TraceEvent::Broadcast { rank, .. }
            | TraceEvent::RecvWork { rank, .. }
            | TraceEvent::RecvEndOfRound { rank }
            | TraceEvent::SendCount { rank, .. }
            | TraceEvent::SendBatch { rank, .. } => rank,
            TraceEvent::SendWork { .. }
            | TraceEvent::SendEndOfRound { .. }
            | TraceEvent::RecvCount { .. }
            | TraceEvent::RecvBatch { .. } => super::ROOT_RANK,
        }
    }
}

/// Shared, append-only event log.
#[derive(Debug, Clone, Default)]
pub struct ProtocolTrace {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl ProtocolTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }

    /// Snapshot of every event recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// Events performed by `rank`, in its program order.
    pub fn events_of(&self, rank: usize) -> Vec<TraceEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.actor() == rank)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Communicator wrapper that records into a [`ProtocolTrace`].
#[derive(Debug)]
pub struct TracedComm<C> {
    inner: C,
    trace: ProtocolTrace,
}

impl<C: Communicator> TracedComm<C> {
    pub fn new(inner: C, trace: ProtocolTrace) -> Self {
        Self { inner, trace }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Communicator> Communicator for TracedComm<C> {
    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn broadcast(&self, row: &mut [f64]) -> Result<()> {
        self.inner.broadcast(row)?;
        self.trace.record(TraceEvent::Broadcast {
            rank: self.rank(),
            len: row.len(),
        });
        Ok(())
    }

    fn send_to_worker(&self, worker: usize, message: RootMessage) -> Result<()> {
        let event = match &message {
            RootMessage::Work(row) => TraceEvent::SendWork {
                to: worker,
                ordinal: row.ordinal,
            },
            RootMessage::EndOfRound => TraceEvent::SendEndOfRound { to: worker },
        };
        self.inner.send_to_worker(worker, message)?;
        self.trace.record(event);
        Ok(())
    }

    fn recv_from_root(&self) -> Result<RootMessage> {
        let message = self.inner.recv_from_root()?;
        let rank = self.rank();
        self.trace.record(match &message {
            RootMessage::Work(row) => TraceEvent::RecvWork {
                rank,
                ordinal: row.ordinal,
            },
            RootMessage::EndOfRound => TraceEvent::RecvEndOfRound { rank },
        });
        Ok(message)
    }

    fn send_to_root(&self, reply: WorkerReply) -> Result<()> {
        let rank = self.rank();
        let event = match &reply {
            WorkerReply::Count(count) => TraceEvent::SendCount {
                rank,
                count: *count,
            },
            WorkerReply::Batch(batch) => TraceEvent::SendBatch {
                rank,
                rows: batch.len(),
            },
        };
        self.inner.send_to_root(reply)?;
        self.trace.record(event);
        Ok(())
    }

    fn recv_from_worker(&self, worker: usize) -> Result<WorkerReply> {
        let reply = self.inner.recv_from_worker(worker)?;
        self.trace.record(match &reply {
            WorkerReply::Count(count) => TraceEvent::RecvCount {
                from: worker,
                count: *count,
            },
            WorkerReply::Batch(batch) => TraceEvent::RecvBatch {
                from: worker,
                rows: batch.len(),
            },
        });
        Ok(reply)
    }
}
