//! Error types for the distributed LU factorization.
//!
//! Configuration problems are detected before any message is sent. Protocol
//! errors describe a peer that vanished or sent something out of turn; the
//! whole process group is considered lost when one of them surfaces.

use thiserror::Error;

/// Errors that can occur while planning, running or reporting a factorization.
#[derive(Debug, Error)]
pub enum LuError {
    /// The process group has no worker besides the root.
    #[error("too few workers: need at least 1 besides the root, got {workers}")]
    TooFewWorkers {
        /// Number of non-root participants available
        workers: usize,
    },

    /// Matrix dimension is not usable (must be >= 1).
    #[error("invalid matrix dimension: {n} (must be >= 1)")]
    InvalidDimension {
        /// The rejected dimension
        n: usize,
    },

    /// The matrix is not square or a buffer does not match its dimension.
    #[error("matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected element or column count
        expected: usize,
        /// Actual element or column count
        got: usize,
    },

    /// A row does not have the length of the active submatrix.
    #[error("row length mismatch: expected {expected} values, got {got}")]
    RowLength {
        /// Active submatrix size
        expected: usize,
        /// Received row length
        got: usize,
    },

    /// The pivot's leading entry is exactly zero and the policy forbids the fallback.
    #[error("degenerate pivot at column {column}: leading entry is zero")]
    DegeneratePivot {
        /// Diagonal position of the pivot
        column: usize,
    },

    /// A reduced row carried an ordinal the root did not dispatch to that worker
    /// in this round, or one that was already returned.
    #[error("unknown row ordinal {ordinal}")]
    UnknownOrdinal {
        /// The offending ordinal
        ordinal: usize,
    },

    /// A worker announced a row count other than the number of rows it was sent.
    #[error("worker {worker} was sent {dispatched} rows but announced {announced}")]
    ReplyCountMismatch {
        /// Rank of the worker
        worker: usize,
        /// Rows dispatched to the worker this round
        dispatched: usize,
        /// Count message value
        announced: usize,
    },

    /// A worker's batch does not contain the number of rows it announced.
    #[error("worker {worker} announced {announced} rows but sent {received}")]
    BatchSizeMismatch {
        /// Rank of the worker
        worker: usize,
        /// Count message value
        announced: usize,
        /// Rows found in the batch
        received: usize,
    },

    /// The channel to a peer is closed.
    #[error("participant {peer} disconnected")]
    Disconnected {
        /// Rank of the unreachable peer
        peer: usize,
    },

    /// A message of the wrong kind arrived.
    #[error("protocol violation on rank {rank}: expected {expected}, got {got}")]
    ProtocolViolation {
        /// Rank that detected the violation
        rank: usize,
        /// Message kind the state machine was waiting for
        expected: &'static str,
        /// Message kind that actually arrived
        got: &'static str,
    },

    /// A wire frame could not be decoded.
    #[error("malformed wire frame of {len} values")]
    MalformedFrame {
        /// Length of the rejected frame
        len: usize,
    },

    /// A root-only operation was called on a worker, or the reverse.
    #[error("rank {rank} cannot {operation}")]
    WrongRole {
        /// Rank that made the call
        rank: usize,
        /// Operation attempted
        operation: &'static str,
    },

    /// A worker thread panicked.
    #[error("worker {rank} panicked")]
    WorkerPanicked {
        /// Rank of the worker
        rank: usize,
    },

    /// The process group could not be brought up.
    #[error("process group bootstrap failed: {0}")]
    Bootstrap(String),

    /// I/O failure while writing the run log or spawning participants.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The run report could not be serialized.
    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for LU operations.
pub type Result<T> = std::result::Result<T, LuError>;

impl LuError {
    /// Returns `true` if the run was rejected before any message was sent.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LuError::TooFewWorkers { .. }
                | LuError::InvalidDimension { .. }
                | LuError::DimensionMismatch { .. }
        )
    }

    /// Returns `true` if a peer misbehaved or disappeared mid-run.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            LuError::RowLength { .. }
                | LuError::UnknownOrdinal { .. }
                | LuError::ReplyCountMismatch { .. }
                | LuError::BatchSizeMismatch { .. }
                | LuError::Disconnected { .. }
                | LuError::ProtocolViolation { .. }
                | LuError::MalformedFrame { .. }
                | LuError::WrongRole { .. }
                | LuError::WorkerPanicked { .. }
        )
    }

    /// Returns `true` if the factorization hit a numerical dead end.
    pub fn is_numerical_error(&self) -> bool {
        matches!(self, LuError::DegeneratePivot { .. })
    }
}
