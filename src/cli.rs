//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Resolves settings
//! (flags over config file over defaults), runs each subcommand and prints
//! its result.

use anyhow::{bail, ensure, Result};
use primepi::cluster::coordinator::{CoordinatorConfig, DEFAULT_WORKER_TIMEOUT};
use primepi::cluster::{worker, ClusterOptions, Transport};
use primepi::config::{self, Settings};
use primepi::leaves::LeafContext;
use primepi::partition::s2;
use primepi::phi::{phi_of, tiny_phi_cutoff};
use primepi::pi::{parse_x, pi_legendre, pi_lmo, pi_lmo_cluster, LmoParams, SMALL_X};
use primepi::pmath::{iroot3, isqrt};
use primepi::progress::Progress;
use primepi::sieve::Tables;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::{Cli, Commands};

const DEFAULT_STATUS_INTERVAL: u64 = 30;

pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(p) => config::load(p),
        None => Ok(Settings::default()),
    }
}

pub fn configure_rayon(threads: Option<usize>) {
    let num_threads = threads.unwrap_or(0);
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        warn!(error = %e, "Could not configure rayon thread pool");
    }
}

fn alpha(cli: &Cli, settings: &Settings) -> Result<Option<f64>> {
    let alpha = cli.alpha.or(settings.alpha);
    if let Some(a) = alpha {
        ensure!(a >= 1.0 && a.is_finite(), "alpha must be a finite number >= 1, got {}", a);
    }
    Ok(alpha)
}

/// Start the status reporter unless disabled; `stop` it when done.
fn start_progress(cli: &Cli, settings: &Settings) -> (Arc<Progress>, Option<std::thread::JoinHandle<()>>) {
    let progress = Progress::new();
    let secs = cli
        .status_interval
        .or(settings.status_interval_secs)
        .unwrap_or(DEFAULT_STATUS_INTERVAL);
    let reporter = (secs > 0).then(|| progress.start_reporter(Duration::from_secs(secs)));
    (progress, reporter)
}

fn finish_progress(progress: &Progress, reporter: Option<std::thread::JoinHandle<()>>) {
    progress.stop();
    if let Some(handle) = reporter {
        let _ = handle.join();
    }
}

pub fn run_pi(cli: &Cli, settings: &Settings, x: &str) -> Result<()> {
    let x = parse_x(x)?;
    let alpha = alpha(cli, settings)?;
    let threads = rayon::current_num_threads();
    let (progress, reporter) = start_progress(cli, settings);

    let pi = pi_lmo(x, threads, alpha, Some(progress.as_ref()));
    finish_progress(&progress, reporter);

    info!(x = %x, pi = %pi, "done");
    println!("{}", pi);
    Ok(())
}

pub fn run_s2(cli: &Cli, settings: &Settings, x: &str, y: Option<i64>) -> Result<()> {
    let x = parse_x(x)?;
    ensure!(x >= SMALL_X, "s2 needs x >= {}", SMALL_X);
    let y = match y {
        Some(y) => {
            let (lo, hi) = (iroot3(x) as i64, isqrt(x) as i64);
            if y < lo || y > hi {
                bail!("y must lie in [{}, {}] for x = {}, got {}", lo, hi, x, y);
            }
            y
        }
        None => LmoParams::new(x, alpha(cli, settings)?).y,
    };
    let c = tiny_phi_cutoff(y);
    let threads = rayon::current_num_threads();
    let (progress, reporter) = start_progress(cli, settings);
    progress.set_stage("S2");

    let tables = Tables::new(y);
    let result = s2(x, y, c, &tables, threads, Some(progress.as_ref()));
    finish_progress(&progress, reporter);

    info!(x = %x, y, c, s2 = %result, "done");
    println!("{}", result);
    Ok(())
}

pub fn run_phi(x: &str, a: usize) -> Result<()> {
    let x = parse_x(x)?;
    println!("{}", phi_of(x, a));
    Ok(())
}

pub fn run_legendre(x: &str) -> Result<()> {
    let x = parse_x(x)?;
    println!("{}", pi_legendre(x));
    Ok(())
}

pub fn run_cluster(cli: &Cli, settings: &Settings, x: &str) -> Result<()> {
    let Commands::Cluster {
        workers,
        threads_per_worker,
        transport,
        worker_timeout,
        checkpoint,
        ..
    } = &cli.command
    else {
        bail!("run_cluster called for another subcommand");
    };
    let x = parse_x(x)?;
    let alpha = alpha(cli, settings)?;
    let cs = &settings.cluster;

    let workers = workers.or(cs.workers).unwrap_or(2);
    ensure!(workers > 0, "--workers must be at least 1");
    let threads_per_worker = threads_per_worker
        .or(cs.threads_per_worker)
        .unwrap_or_else(|| (rayon::current_num_threads() / workers).max(1));
    let timeout = worker_timeout
        .or(cs.worker_timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_WORKER_TIMEOUT);
    ensure!(!timeout.is_zero(), "--worker-timeout must be positive");

    let opts = ClusterOptions {
        workers,
        threads_per_worker,
        transport: transport.or(cs.transport).unwrap_or(Transport::Local),
        binary: None,
        coordinator: CoordinatorConfig {
            worker_timeout: timeout,
            checkpoint: checkpoint.clone().or_else(|| cs.checkpoint.clone()),
        },
    };

    let (progress, reporter) = start_progress(cli, settings);
    let result = pi_lmo_cluster(x, alpha, &opts, Some(progress.as_ref()));
    finish_progress(&progress, reporter);
    let pi = result?;

    info!(x = %x, pi = %pi, workers, "done");
    println!("{}", pi);
    Ok(())
}

pub fn run_worker(x: &str, y: i64) -> Result<()> {
    let x = parse_x(x)?;
    ensure!(y >= 3 && y as i128 <= isqrt(x), "invalid y = {} for x = {}", y, x);
    let tables = Tables::new(y);
    let ctx = LeafContext::new(x, y, tiny_phi_cutoff(y), &tables);
    let threads = rayon::current_num_threads();
    info!(x = %x, y, threads, "worker ready");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    worker::serve_lines(&ctx, threads, stdin.lock(), stdout.lock())?;
    Ok(())
}
