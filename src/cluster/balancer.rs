//! Dynamic interval sizing for the cluster coordinator.
//!
//! Work is handed out left to right as inclusive intervals that tile
//! `[1, z]`. Early intervals are small; each completion either doubles the
//! next interval (the reporting worker finished well inside its time budget)
//! or halves it, never below `√z`. The time budget shrinks as the run nears
//! completion so that the last intervals finish at roughly the same time on
//! every worker.
//!
//! Only the completion with the highest `high` seen so far updates the
//! adopted interval size and timing: stale reports from slow workers must not
//! drag the size back down.

use std::time::Instant;

use tracing::trace;

use super::message::{WorkInterval, WorkMessage};
use crate::partition::default_segment_size;
use crate::pmath::isqrt;

pub struct LoadBalancer {
    z: i64,
    workers: usize,
    /// Next unassigned integer.
    low: i64,
    max_finished: i64,
    proc_interval: i64,
    segment_size: i64,
    segments_per_thread: i64,
    seconds: f64,
    start: Instant,
}

impl LoadBalancer {
    pub fn new(z: i64, workers: usize) -> Self {
        Self::resume(z, workers, 1)
    }

    /// Continue handing out work from `low` after a restart.
    pub fn resume(z: i64, workers: usize, low: i64) -> Self {
        assert!(workers > 0, "load balancer needs at least one worker");
        LoadBalancer {
            z,
            workers,
            low: low.max(1),
            max_finished: 0,
            proc_interval: Self::min_interval(z),
            segment_size: default_segment_size(z),
            segments_per_thread: 1,
            seconds: 0.0,
            start: Instant::now(),
        }
    }

    fn min_interval(z: i64) -> i64 {
        isqrt(z.max(1) as i128) as i64
    }

    pub fn z(&self) -> i64 {
        self.z
    }

    /// True once every integer of `[1, z]` has been assigned.
    pub fn finished(&self) -> bool {
        self.low > self.z
    }

    /// First assignment of a worker, sized `√z`.
    pub fn initial(&mut self, worker_id: usize) -> WorkMessage {
        let interval = self.next_interval(Self::min_interval(self.z));
        WorkMessage::assign(worker_id, interval)
    }

    /// Turn a completion into the next assignment for the same worker.
    pub fn update(&mut self, msg: &mut WorkMessage, percent: f64) {
        let elapsed = self.start.elapsed().as_secs_f64();
        self.update_with_elapsed(msg, percent, elapsed);
    }

    /// [`update`](Self::update) with an explicit run time, in seconds.
    pub fn update_with_elapsed(&mut self, msg: &mut WorkMessage, percent: f64, elapsed: f64) {
        assert!(!self.finished(), "no work left to assign");

        if msg.interval.high >= self.max_finished {
            self.max_finished = msg.interval.high;
            self.proc_interval = (msg.interval.high - msg.interval.low).max(1);
            self.segment_size = msg.interval.segment_size.max(self.segment_size);
            self.segments_per_thread = self
                .segments_per_thread
                .max(msg.interval.segments_per_thread);
            self.seconds = msg.seconds;
        }

        let next = if self.is_increase(percent, elapsed) {
            self.proc_interval.saturating_mul(2)
        } else {
            (self.proc_interval / 2).max(Self::min_interval(self.z))
        };

        let interval = self.next_interval(next);
        trace!(
            worker = msg.worker_id,
            low = interval.low,
            high = interval.high,
            seconds = self.seconds,
            percent,
            "next interval"
        );
        msg.reassign(interval);
    }

    /// Grow the interval while the last adopted completion took less than
    /// the per-worker share of the estimated remaining time.
    pub fn is_increase(&self, percent: f64, elapsed: f64) -> bool {
        let percent = percent.max(1.0);
        let remaining = elapsed * (100.0 / percent) - elapsed;
        let max_time = remaining / self.workers as f64;
        let near_finish = elapsed / 50f64.max(self.workers as f64 / 2.0);
        let budget = 0.1f64.max(max_time).max(near_finish);
        self.seconds < budget
    }

    fn next_interval(&mut self, size: i64) -> WorkInterval {
        let low = self.low;
        let high = low.saturating_add(size).min(self.z);
        self.low = high + 1;
        WorkInterval {
            low,
            high,
            segment_size: self.segment_size,
            segments_per_thread: self.segments_per_thread,
        }
    }
}
