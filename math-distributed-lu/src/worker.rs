//! Worker side of the elimination rounds

use crate::comm::{Communicator, ROOT_RANK};
use crate::error::{LuError, Result};
use crate::kernel;
use crate::protocol::{ReducedRowBatch, RootMessage, WorkRow, WorkerReply};

/// Non-root role driver.
pub struct RoundWorker<'a, C: Communicator> {
    comm: &'a C,
}

impl<'a, C: Communicator> RoundWorker<'a, C> {
    pub fn new(comm: &'a C) -> Result<Self> {
        if comm.rank() == ROOT_RANK {
            return Err(LuError::WrongRole {
                rank: comm.rank(),
                operation: "work on rounds",
            });
        }
        Ok(Self { comm })
    }

    /// Take part in every round of an `n x n` factorization.
    ///
    /// Returns the number of rows this worker reduced.
    pub fn run(&self, n: usize) -> Result<usize> {
        if n == 0 {
            return Err(LuError::InvalidDimension { n });
        }
        let mut reduced = 0;
        for active in (2..=n).rev() {
            reduced += self.run_round(active)?;
        }
        log::debug!("worker {} reduced {reduced} rows", self.comm.rank());
        Ok(reduced)
    }

    /// Pivot, rows until end of round, then the drain reply.
    fn run_round(&self, active: usize) -> Result<usize> {
        let mut pivot = vec![0.0; active];
        self.comm.broadcast(&mut pivot)?;

        let mut batch = ReducedRowBatch::new();
        while let RootMessage::Work(row) = self.comm.recv_from_root()? {
            if row.values.len() != active {
                return Err(LuError::RowLength {
                    expected: active,
                    got: row.values.len(),
                });
            }
            batch.push(WorkRow {
                ordinal: row.ordinal,
                values: kernel::eliminate(&pivot, &row.values),
            });
        }

        let count = batch.len();
        self.comm.send_to_root(WorkerReply::Count(count))?;
        if count > 0 {
            self.comm.send_to_root(WorkerReply::Batch(batch))?;
        }
        Ok(count)
    }
}
