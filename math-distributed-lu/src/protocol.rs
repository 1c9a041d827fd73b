//! Messages exchanged between the root and the workers
//!
//! Downlink (root to worker) carries [`RootMessage`]: work rows, then one
//! end-of-round marker. Uplink (worker to root) carries [`WorkerReply`]: a row
//! count, then the reduced batch when the count is non-zero.

/// A row in flight, tagged with its global ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkRow {
    /// Global row ordinal, used by the root to find the save point
    pub ordinal: usize,
    /// Coefficients of the active submatrix row (or its reduction)
    pub values: Vec<f64>,
}

/// Root to worker message.
#[derive(Debug, Clone, PartialEq)]
pub enum RootMessage {
    /// A row to reduce against the current pivot.
    Work(WorkRow),
    /// All rows of the round have been sent; report the batch.
    EndOfRound,
}

impl RootMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            RootMessage::Work(_) => "work row",
            RootMessage::EndOfRound => "end of round",
        }
    }
}

/// Reduced rows accumulated by one worker during one round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducedRowBatch {
    rows: Vec<WorkRow>,
}

impl ReducedRowBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: WorkRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[WorkRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<WorkRow> {
        self.rows
    }
}

impl From<Vec<WorkRow>> for ReducedRowBatch {
    fn from(rows: Vec<WorkRow>) -> Self {
        Self { rows }
    }
}

/// Worker to root message.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerReply {
    /// Number of rows reduced this round.
    Count(usize),
    /// The reduced rows; only sent when the count is non-zero.
    Batch(ReducedRowBatch),
}

impl WorkerReply {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerReply::Count(_) => "row count",
            WorkerReply::Batch(_) => "row batch",
        }
    }
}

/// Flat `f64` encoding for transports that only move typed buffers.
///
/// The ordinal is stored bit-for-bit in a trailing `f64` slot
/// (`f64::from_bits`), so it survives transport without rounding.
pub mod wire {
    use super::{ReducedRowBatch, WorkRow};
    use crate::error::{LuError, Result};

    fn ordinal_slot(ordinal: usize) -> f64 {
        f64::from_bits(ordinal as u64)
    }

    fn slot_ordinal(slot: f64) -> usize {
        slot.to_bits() as usize
    }

    /// `[count]`, stored bit-for-bit like an ordinal.
    pub fn encode_count(count: usize) -> Vec<f64> {
        vec![ordinal_slot(count)]
    }

    pub fn decode_count(frame: &[f64]) -> Result<usize> {
        match frame {
            [slot] => Ok(slot_ordinal(*slot)),
            _ => Err(LuError::MalformedFrame { len: frame.len() }),
        }
    }

    /// `[values.., ordinal]`
    pub fn encode_work_row(row: &WorkRow) -> Vec<f64> {
        let mut frame = Vec::with_capacity(row.values.len() + 1);
        frame.extend_from_slice(&row.values);
        frame.push(ordinal_slot(row.ordinal));
        frame
    }

    pub fn decode_work_row(mut frame: Vec<f64>) -> Result<WorkRow> {
        let len = frame.len();
        let slot = frame.pop().ok_or(LuError::MalformedFrame { len })?;
        Ok(WorkRow {
            ordinal: slot_ordinal(slot),
            values: frame,
        })
    }

    /// `[width, (values.., ordinal) * rows]` with `width` stored like an ordinal.
    pub fn encode_batch(batch: &ReducedRowBatch) -> Vec<f64> {
        let width = batch.rows().first().map_or(0, |row| row.values.len());
        let mut frame = Vec::with_capacity(1 + batch.len() * (width + 1));
        frame.push(ordinal_slot(width));
        for row in batch.rows() {
            debug_assert_eq!(row.values.len(), width);
            frame.extend_from_slice(&row.values);
            frame.push(ordinal_slot(row.ordinal));
        }
        frame
    }

    pub fn decode_batch(frame: &[f64]) -> Result<ReducedRowBatch> {
        let malformed = LuError::MalformedFrame { len: frame.len() };
        let Some((&width_slot, body)) = frame.split_first() else {
            return Err(malformed);
        };
        let Some(stride) = slot_ordinal(width_slot).checked_add(1) else {
            return Err(malformed);
        };
        if body.len() % stride != 0 {
            return Err(malformed);
        }

        let rows = body
            .chunks_exact(stride)
            .map(|chunk| WorkRow {
                ordinal: slot_ordinal(chunk[stride - 1]),
                values: chunk[..stride - 1].to_vec(),
            })
            .collect::<Vec<_>>();
        Ok(ReducedRowBatch::from(rows))
    }
}
