//! # Main — CLI Entry Point
//!
//! Routes subcommands to the counting functions. Results go to stdout, one
//! number per line; logs and progress go to stderr.
//!
//! ## Subcommands
//!
//! - `pi <X>`: π(x) by LMO on the local rayon pool.
//! - `s2 <X>`: the special-leaf sum alone, optionally for a chosen `y`.
//! - `phi <X> <A>`: the partial sieve function φ(x, a).
//! - `legendre <X>`: π(x) by Legendre's formula (cross-check).
//! - `cluster <X>`: π(x) with S2 spread over local or process workers.
//! - `worker`: serve cluster assignments on stdin/stdout (started by `cluster`).
//!
//! `X` accepts expressions such as `10^12`, `2*10^9` or `1e15`.
//!
//! ## Global Options
//!
//! - `--threads` / `PRIMEPI_THREADS`: rayon pool size (defaults to all cores).
//! - `--alpha`: LMO tuning factor, `y = α · x^{1/3}`.
//! - `--config`: TOML file with defaults for the options above.
//! - `--status-interval`: seconds between progress lines (0 disables).

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use primepi::cluster::Transport;

#[derive(Parser)]
#[command(name = "primepi", version, about = "Count primes with the Lagarias-Miller-Odlyzko method")]
struct Cli {
    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long, env = "PRIMEPI_THREADS", global = true)]
    threads: Option<usize>,

    /// Tuning factor for y = alpha * x^(1/3) (>= 1; default grows slowly with x)
    #[arg(long, global = true)]
    alpha: Option<f64>,

    /// TOML settings file
    #[arg(long, env = "PRIMEPI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Seconds between progress log lines (0 disables)
    #[arg(long, global = true)]
    status_interval: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count the primes <= X
    Pi {
        /// Upper bound, e.g. 1000000, 10^12, 2*10^9, 1e15
        x: String,
    },
    /// Compute the special-leaf sum S2(x, y)
    S2 {
        x: String,
        /// Sieving bound y (defaults to the LMO choice for x)
        #[arg(long)]
        y: Option<i64>,
    },
    /// Compute the partial sieve function phi(x, a)
    Phi {
        x: String,
        /// Number of leading primes sieved out
        a: usize,
    },
    /// Count the primes <= X with Legendre's formula
    Legendre { x: String },
    /// Count the primes <= X with S2 computed by a set of workers
    Cluster {
        x: String,
        /// Number of workers
        #[arg(long)]
        workers: Option<usize>,
        /// Threads per worker
        #[arg(long)]
        threads_per_worker: Option<usize>,
        /// How workers are run
        #[arg(long, value_enum)]
        transport: Option<Transport>,
        /// Seconds a worker may hold one interval before the run is aborted
        #[arg(long)]
        worker_timeout: Option<u64>,
        /// Checkpoint file for resuming an interrupted run
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Serve cluster assignments on stdin, answering on stdout
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        x: String,
        #[arg(long)]
        y: i64,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging: LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let settings = cli::load_settings(cli.config.as_deref())?;
    let threads = cli.threads.or(settings.threads);
    cli::configure_rayon(threads);

    match &cli.command {
        Commands::Pi { x } => cli::run_pi(&cli, &settings, x),
        Commands::S2 { x, y } => cli::run_s2(&cli, &settings, x, *y),
        Commands::Phi { x, a } => cli::run_phi(x, *a),
        Commands::Legendre { x } => cli::run_legendre(x),
        Commands::Cluster { x, .. } => cli::run_cluster(&cli, &settings, x),
        Commands::Worker { x, y } => cli::run_worker(x, *y),
    }
}
