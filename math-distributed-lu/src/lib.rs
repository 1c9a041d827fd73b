//! Dense LU factorization distributed over a root and a set of workers
//!
//! The root owns the matrix. Each elimination round it broadcasts the pivot
//! row, deals the remaining rows round-robin to the workers, and writes the
//! reduced rows back where they belong once every worker has drained its
//! batch. Workers never see the matrix, only the rows they are sent.
//!
//! No row interchange is performed: a zero pivot is either tolerated with a
//! warning or rejected, see [`ZeroPivotPolicy`].
//!
//! # Features
//!
//! - **Protocol**: [`RoundCoordinator`] and [`RoundWorker`] over any [`Communicator`]
//! - **Backends**: in-process threads ([`LocalComm`]), MPI (`MpiComm`, `mpi` feature),
//!   and a recording wrapper ([`TracedComm`])
//! - **Reference**: [`eliminate_sequential`], bit-identical to the distributed result
//!
//! # Example
//!
//! ```
//! use math_distributed_lu::{FactorConfig, MatrixStore, factorize_local, max_abs_diff};
//! use ndarray::array;
//!
//! let a = array![[4.0, 3.0, 2.0], [2.0, 1.0, 1.0], [1.0, 2.0, 3.0]];
//! let mut lu = MatrixStore::new(a.clone())?;
//! let report = factorize_local(&mut lu, 2, &FactorConfig::default())?;
//!
//! assert!(report.is_exact());
//! assert!(max_abs_diff(&lu.reconstruct(), &a)? < 1e-12);
//! # Ok::<(), math_distributed_lu::LuError>(())
//! ```

pub mod comm;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod driver;
pub mod error;
pub mod generate;
pub mod kernel;
pub mod matrix;
pub mod plan;
pub mod protocol;
pub mod report;
pub mod runlog;
pub mod sequential;
pub mod worker;

// Re-export main types
pub use comm::{
    Communicator, LocalComm, ProtocolTrace, ROOT_RANK, TraceEvent, TracedComm, local_group,
    local_group_bounded,
};
pub use config::{FactorConfig, FactorConfigBuilder, ZeroPivotPolicy};
pub use coordinator::RoundCoordinator;
pub use error::{LuError, Result};
pub use matrix::{MatrixStore, max_abs_diff};
pub use plan::{EliminationPlan, SavePoint, SavePointIndex, assign_worker};
pub use protocol::{ReducedRowBatch, RootMessage, WorkRow, WorkerReply};
pub use report::FactorReport;
pub use runlog::{RunLog, RunVariant};
pub use worker::RoundWorker;

#[cfg(feature = "mpi")]
pub use comm::MpiComm;

// Re-export drivers and helpers
pub use display::{render_lower, render_matrix, render_upper};
pub use driver::{factorize_local, factorize_local_with, run_local, run_sequential};
pub use generate::random_matrix;
pub use sequential::{eliminate_sequential, factorize_sequential};
