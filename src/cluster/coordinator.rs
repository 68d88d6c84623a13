//! Cluster coordinator: hands out intervals, leases them, and folds the
//! returned partial sums in interval order.
//!
//! Completions arrive in any order. Each one is parked until every interval
//! to its left has been folded; only then is it absorbed into the running
//! record. The folded prefix `[1, frontier)` is what gets checkpointed.
//!
//! A worker that exceeds its lease or disappears aborts the run with an
//! error naming the worker and its interval. Intervals are never reassigned;
//! a rerun with the same checkpoint path resumes from the frontier.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, ensure, Result};
use tracing::{debug, info, warn};

use super::balancer::LoadBalancer;
use super::message::{WorkInterval, WorkMessage};
use super::pool::WorkerPool;
use crate::checkpoint::{self, Checkpoint};
use crate::leaves::LeafSums;
use crate::pmath::get_percent;

/// Default time a worker may hold one interval.
pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub worker_timeout: Duration,
    pub checkpoint: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            worker_timeout: DEFAULT_WORKER_TIMEOUT,
            checkpoint: None,
        }
    }
}

struct Lease {
    interval: WorkInterval,
    issued: Instant,
}

pub struct Coordinator {
    x: i128,
    y: i64,
    z: i64,
    balancer: LoadBalancer,
    /// Smallest integer not yet folded into `merged`.
    frontier: i64,
    merged: LeafSums,
    pending: BTreeMap<i64, (WorkInterval, LeafSums)>,
    leases: HashMap<usize, Lease>,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Set up a run over `[1, x/y]`, resuming from the checkpoint when one
    /// for the same `(x, y)` exists.
    pub fn new(x: i128, y: i64, workers: usize, config: CoordinatorConfig) -> Self {
        let z = (x / y as i128) as i64;
        let mut frontier = 1;
        let mut merged = LeafSums::default();

        if let Some(path) = &config.checkpoint {
            match checkpoint::load(path) {
                Some(Checkpoint::S2 {
                    x: cx,
                    y: cy,
                    frontier: cf,
                    sums,
                    saved_at,
                }) if cx == x && cy == y => {
                    info!(frontier = cf, z, saved_at = %saved_at, "resuming from checkpoint");
                    frontier = cf;
                    merged = sums;
                }
                Some(Checkpoint::S2 { x: cx, y: cy, .. }) => {
                    warn!(checkpoint_x = %cx, checkpoint_y = cy, "checkpoint is for a different computation, ignoring");
                }
                None => {}
            }
        }

        Coordinator {
            x,
            y,
            z,
            balancer: LoadBalancer::resume(z, workers, frontier),
            frontier,
            merged,
            pending: BTreeMap::new(),
            leases: HashMap::new(),
            config,
        }
    }

    pub fn frontier(&self) -> i64 {
        self.frontier
    }

    /// Drive `pool` until `[1, z]` is covered and return S2.
    pub fn run<P: WorkerPool>(mut self, pool: &mut P) -> Result<i128> {
        ensure!(pool.len() > 0, "cluster needs at least one worker");
        info!(x = %self.x, y = self.y, z = self.z, workers = pool.len(), "coordinator started");

        for worker_id in 0..pool.len() {
            if self.balancer.finished() {
                pool.send(WorkMessage::stop(worker_id))?;
            } else {
                let msg = self.balancer.initial(worker_id);
                self.lease(pool, msg)?;
            }
        }

        while !self.leases.is_empty() {
            let timeout = self.next_deadline();
            let mut msg = match pool.recv_timeout(timeout)? {
                Some(msg) => msg,
                None => {
                    if let Some((id, lease)) = self.expired() {
                        bail!(
                            "worker {} did not finish interval [{}, {}] within {:?}",
                            id,
                            lease.interval.low,
                            lease.interval.high,
                            self.config.worker_timeout
                        );
                    }
                    continue;
                }
            };

            let id = msg.worker_id;
            let lease = self
                .leases
                .remove(&id)
                .ok_or_else(|| anyhow!("unexpected completion from worker {}", id))?;
            ensure!(
                msg.interval.low == lease.interval.low && msg.interval.high == lease.interval.high,
                "worker {} reported [{}, {}] but was leased [{}, {}]",
                id,
                msg.interval.low,
                msg.interval.high,
                lease.interval.low,
                lease.interval.high
            );
            let sums = msg
                .result
                .take()
                .ok_or_else(|| anyhow!("worker {} sent no result for [{}, {}]", id, lease.interval.low, lease.interval.high))?;
            self.fold(msg.interval, sums)?;

            if self.balancer.finished() {
                pool.send(WorkMessage::stop(id))?;
            } else {
                let percent = get_percent(self.frontier - 1, self.z);
                self.balancer.update(&mut msg, percent);
                self.lease(pool, msg)?;
            }
        }

        pool.shutdown()?;
        ensure!(
            self.pending.is_empty() && self.frontier == self.z + 1,
            "coverage incomplete: folded up to {} of {}",
            self.frontier - 1,
            self.z
        );
        info!(s2 = %self.merged.sum, "coordinator finished");
        Ok(self.merged.sum)
    }

    fn lease<P: WorkerPool>(&mut self, pool: &mut P, msg: WorkMessage) -> Result<()> {
        debug!(
            worker = msg.worker_id,
            low = msg.interval.low,
            high = msg.interval.high,
            "assigning interval"
        );
        self.leases.insert(
            msg.worker_id,
            Lease {
                interval: msg.interval,
                issued: Instant::now(),
            },
        );
        pool.send(msg)
    }

    fn next_deadline(&self) -> Duration {
        self.leases
            .values()
            .map(|l| (l.issued + self.config.worker_timeout).saturating_duration_since(Instant::now()))
            .min()
            .unwrap_or(self.config.worker_timeout)
    }

    fn expired(&self) -> Option<(usize, &Lease)> {
        let now = Instant::now();
        self.leases
            .iter()
            .find(|(_, l)| now.duration_since(l.issued) >= self.config.worker_timeout)
            .map(|(&id, l)| (id, l))
    }

    /// Park the record of `interval`, then fold every parked record that
    /// now touches the frontier.
    fn fold(&mut self, interval: WorkInterval, sums: LeafSums) -> Result<()> {
        ensure!(
            interval.low >= self.frontier && !self.pending.contains_key(&interval.low),
            "interval [{}, {}] reported twice",
            interval.low,
            interval.high
        );
        self.pending.insert(interval.low, (interval, sums));

        let before = self.frontier;
        while let Some((interval, sums)) = self.pending.remove(&self.frontier) {
            self.merged.absorb(sums);
            self.frontier = interval.high + 1;
        }

        if self.frontier != before {
            debug!(frontier = self.frontier, parked = self.pending.len(), "frontier advanced");
            if let Some(path) = &self.config.checkpoint {
                let cp = Checkpoint::s2(self.x, self.y, self.frontier, self.merged.clone());
                if let Err(e) = checkpoint::save(path, &cp) {
                    warn!(error = %e, path = %path.display(), "failed to save checkpoint");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Pool that answers with canned sums and can hold back one worker.
    struct ScriptedPool {
        workers: usize,
        silent: Option<usize>,
        queue: VecDeque<WorkMessage>,
        stops: usize,
    }

    impl WorkerPool for ScriptedPool {
        fn len(&self) -> usize {
            self.workers
        }

        fn send(&mut self, mut msg: WorkMessage) -> Result<()> {
            if msg.finished {
                self.stops += 1;
                return Ok(());
            }
            if Some(msg.worker_id) == self.silent {
                return Ok(());
            }
            msg.result = Some(LeafSums {
                sum: msg.interval.len() as i128,
                phi: vec![],
                mu_sum: vec![],
            });
            // Answered newest first, so completions arrive out of order.
            self.queue.push_back(msg);
            Ok(())
        }

        fn recv_timeout(&mut self, _timeout: Duration) -> Result<Option<WorkMessage>> {
            Ok(self.queue.pop_back())
        }

        fn shutdown(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn folds_every_interval_once() {
        let mut pool = ScriptedPool {
            workers: 3,
            silent: None,
            queue: VecDeque::new(),
            stops: 0,
        };
        let (x, y) = (10i128.pow(9), 1_000i64);
        let coordinator = Coordinator::new(x, y, 3, CoordinatorConfig::default());
        // Each interval reports its length, so the total is z.
        assert_eq!(coordinator.run(&mut pool).unwrap(), 1_000_000);
        assert_eq!(pool.stops, 3);
    }

    #[test]
    fn stalled_worker_is_reported() {
        let mut pool = ScriptedPool {
            workers: 2,
            silent: Some(1),
            queue: VecDeque::new(),
            stops: 0,
        };
        let config = CoordinatorConfig {
            worker_timeout: Duration::from_millis(50),
            checkpoint: None,
        };
        let err = Coordinator::new(10i128.pow(9), 1_000, 2, config)
            .run(&mut pool)
            .unwrap_err();
        assert!(err.to_string().contains("worker 1 did not finish interval"), "{}", err);
    }

    #[test]
    fn resumes_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s2.checkpoint");
        let (x, y) = (10i128.pow(9), 1_000i64);
        let parked = LeafSums {
            sum: 400_000,
            phi: vec![],
            mu_sum: vec![],
        };
        checkpoint::save(&path, &Checkpoint::s2(x, y, 400_001, parked)).unwrap();

        let config = CoordinatorConfig {
            checkpoint: Some(path.clone()),
            ..CoordinatorConfig::default()
        };
        let coordinator = Coordinator::new(x, y, 2, config);
        assert_eq!(coordinator.frontier(), 400_001);
        let mut pool = ScriptedPool {
            workers: 2,
            silent: None,
            queue: VecDeque::new(),
            stops: 0,
        };
        assert_eq!(coordinator.run(&mut pool).unwrap(), 1_000_000);

        match checkpoint::load(&path).unwrap() {
            Checkpoint::S2 { frontier, .. } => assert_eq!(frontier, 1_000_001),
        }
    }

    #[test]
    fn checkpoint_for_other_x_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s2.checkpoint");
        checkpoint::save(&path, &Checkpoint::s2(12345, 10, 500, LeafSums::default())).unwrap();
        let config = CoordinatorConfig {
            checkpoint: Some(path),
            ..CoordinatorConfig::default()
        };
        assert_eq!(Coordinator::new(10i128.pow(9), 1_000, 1, config).frontier(), 1);
    }
}
