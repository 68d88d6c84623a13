//! # Cluster — Distributed Special-Leaf Computation
//!
//! Splits the S2 line `[1, x/y]` across a set of workers. One coordinator
//! ([`coordinator::Coordinator`]) owns the [`balancer::LoadBalancer`],
//! leases intervals, and folds the returned [`LeafSums`](crate::leaves::LeafSums)
//! in interval order. Each worker runs the thread-level
//! [`partition`](crate::partition::partition) on its interval.
//!
//! ```text
//!   coordinator ──assign [low, high]──▶ worker k ── partition ──▶ rayon threads
//!        ▲                                  │
//!        └────── completion + LeafSums ─────┘
//! ```
//!
//! Workers are either threads of this process ([`pool::LocalPool`]) or
//! `primepi worker` child processes ([`pool::ProcessPool`]).

pub mod balancer;
pub mod coordinator;
pub mod message;
pub mod pool;
pub mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sieve::Tables;
use coordinator::{Coordinator, CoordinatorConfig};
use pool::{LocalPool, ProcessPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Worker threads inside this process.
    #[default]
    Local,
    /// `primepi worker` child processes over stdin/stdout.
    Process,
}

#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub workers: usize,
    pub threads_per_worker: usize,
    pub transport: Transport,
    /// Executable started for each process worker; defaults to this binary.
    pub binary: Option<PathBuf>,
    pub coordinator: CoordinatorConfig,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        ClusterOptions {
            workers: 2,
            threads_per_worker: 1,
            transport: Transport::Local,
            binary: None,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

/// S2 computed by a coordinator and `opts.workers` workers.
pub fn s2_cluster(x: i128, y: i64, c: usize, tables: &Arc<Tables>, opts: &ClusterOptions) -> Result<i128> {
    let workers = opts.workers.max(1);
    let threads = opts.threads_per_worker.max(1);
    info!(workers, threads_per_worker = threads, transport = ?opts.transport, "starting cluster");
    let coordinator = Coordinator::new(x, y, workers, opts.coordinator.clone());

    match opts.transport {
        Transport::Local => {
            let mut pool = LocalPool::spawn(x, y, c, Arc::clone(tables), workers, threads);
            coordinator.run(&mut pool)
        }
        Transport::Process => {
            let binary = match &opts.binary {
                Some(path) => path.clone(),
                None => std::env::current_exe().context("locating worker executable")?,
            };
            let mut pool = ProcessPool::spawn(&binary, x, y, workers, threads)?;
            coordinator.run(&mut pool)
        }
    }
}
