use std::path::PathBuf;
use std::process;

use anyhow::{Context, ensure};
use clap::Parser;
use clap::error::ErrorKind;
use math_distributed_lu::runlog::DEFAULT_LOG_FILE;
use math_distributed_lu::{
    FactorConfig, RunLog, RunVariant, random_matrix, render_lower, render_matrix, render_upper,
    run_local, run_sequential,
};

#[derive(Parser, Debug)]
#[command(
    name = "lu_local",
    about = "Factorize a random n x n matrix with worker threads sharing the rows round-robin"
)]
struct Cli {
    /// Matrix dimension (>= 1)
    n: usize,

    /// Number of worker threads (>= 1)
    #[arg(long, default_value_t = 3)]
    workers: usize,

    /// Run the single-threaded baseline instead of the workers
    #[arg(long)]
    sequential: bool,

    /// Optional random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Print the input matrix and both factors
    #[arg(long)]
    print: bool,

    /// File the timing line is appended to
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Abort on a zero pivot instead of continuing without pivoting
    #[arg(long)]
    fail_on_zero_pivot: bool,

    /// Log progress every N rounds (0 = off)
    #[arg(long, default_value_t = 0)]
    progress_every: usize,
}

fn main() {
    env_logger::init();

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

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    ensure!(cli.n >= 1, "matrix dimension must be at least 1, got {}", cli.n);
    ensure!(
        cli.sequential || cli.workers >= 1,
        "at least one worker is required, got {}",
        cli.workers
    );

    let config = FactorConfig::builder()
        .fail_on_zero_pivot(cli.fail_on_zero_pivot)
        .progress_interval(cli.progress_every)
        .build();

    let a = random_matrix(cli.n, cli.seed)?;
    let mut lu = a.clone();

    let report = if cli.sequential {
        let run_log = RunLog::new(&cli.log_file, RunVariant::Serial);
        run_sequential(&mut lu, &config, Some(&run_log))
    } else {
        let run_log = RunLog::new(&cli.log_file, RunVariant::Threads);
        run_local(&mut lu, cli.workers, &config, Some(&run_log))
    }
    .context("factorization failed")?;

    // Benchmark scripts read the time as the first token.
    println!("{:.3} s", report.elapsed_secs());
    if cli.print {
        println!("[A]\n{}", render_matrix(a.as_array()));
        println!("[L]\n{}", render_lower(&lu));
        println!("[U]\n{}", render_upper(&lu));
    }
    log::info!(
        "LU {n}x{n} on {} workers, {} rows eliminated",
        report.workers,
        report.rows_eliminated,
        n = report.n
    );

    if let Some(path) = &cli.report {
        report
            .write_json(path)
            .with_context(|| format!("cannot write report '{}'", path.display()))?;
        log::info!("report written to {}", path.display());
    }
    Ok(())
}
