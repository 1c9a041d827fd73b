//! Launch with `mpirun -n <W + 1> lu_mpi <n>`. Rank 0 owns the matrix.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, ensure};
use clap::Parser;
use clap::error::ErrorKind;
use math_distributed_lu::runlog::DEFAULT_LOG_FILE;
use math_distributed_lu::{
    Communicator, FactorConfig, MpiComm, RoundCoordinator, RoundWorker, RunLog, RunVariant,
    random_matrix, render_lower, render_matrix, render_upper,
};

#[derive(Parser, Debug)]
#[command(
    name = "lu_mpi",
    about = "Factorize a random n x n matrix over MPI; rank 0 coordinates, every other rank is a worker"
)]
struct Cli {
    /// Matrix dimension (>= 1)
    n: usize,

    /// Optional random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Print the input matrix and both factors (rank 0)
    #[arg(long)]
    print: bool,

    /// File the timing line is appended to (rank 0)
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Write the run report as JSON to this path (rank 0)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Abort on a zero pivot instead of continuing without pivoting
    #[arg(long)]
    fail_on_zero_pivot: bool,

    /// Log progress every N rounds (0 = off, rank 0)
    #[arg(long, default_value_t = 0)]
    progress_every: usize,
}

fn main() {
    env_logger::init();

    // Every rank parses the same command line, so they agree on n.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => process::exit(0),
                _ => process::exit(1),
            }
        }
    };
    if cli.n == 0 {
        eprintln!("Error: matrix dimension must be at least 1");
        process::exit(1);
    }

    let comm = match MpiComm::initialize() {
        Ok(comm) => comm,
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(1);
        }
    };

    let outcome = if comm.is_root() {
        run_root(&comm, &cli)
    } else {
        RoundWorker::new(&comm)
            .and_then(|worker| worker.run(cli.n))
            .map(|rows| log::debug!("rank {} reduced {rows} rows", comm.rank()))
            .map_err(anyhow::Error::from)
    };

    if let Err(err) = outcome {
        eprintln!("Error on rank {}: {err:#}", comm.rank());
        // peers may be blocked on this rank
        comm.abort(1);
    }
}

fn run_root(comm: &MpiComm, cli: &Cli) -> anyhow::Result<()> {
    ensure!(
        comm.workers() >= 1,
        "at least two MPI processes are required, got {}",
        comm.size()
    );

    let config = FactorConfig::builder()
        .fail_on_zero_pivot(cli.fail_on_zero_pivot)
        .progress_interval(cli.progress_every)
        .build();
    let a = random_matrix(cli.n, cli.seed)?;
    let mut lu = a.clone();

    let report = RoundCoordinator::new(comm, &config)?
        .run(&mut lu)
        .context("factorization failed")?;
    RunLog::new(&cli.log_file, RunVariant::Mpi).record_or_log(&report);

    // Benchmark scripts read the time as the first token.
    println!("{:.3} s", report.elapsed_secs());
    if cli.print {
        println!("[A]\n{}", render_matrix(a.as_array()));
        println!("[L]\n{}", render_lower(&lu));
        println!("[U]\n{}", render_upper(&lu));
    }
    log::info!(
        "LU {n}x{n} on {} MPI workers, {} rows eliminated",
        report.workers,
        report.rows_eliminated,
        n = report.n
    );

    if let Some(path) = &cli.report {
        report
            .write_json(path)
            .with_context(|| format!("cannot write report '{}'", path.display()))?;
    }
    Ok(())
}
