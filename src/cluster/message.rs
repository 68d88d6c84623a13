//! Wire format between coordinator and workers.
//!
//! One [`WorkMessage`] per line of JSON. The same record travels both ways:
//! the coordinator fills in the interval and the worker answers with the
//! elapsed time, its final segments-per-thread and the partial sums.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::leaves::LeafSums;

/// Inclusive interval `[low, high]` of the integer line `[1, x/y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkInterval {
    pub low: i64,
    pub high: i64,
    pub segment_size: i64,
    pub segments_per_thread: i64,
}

impl WorkInterval {
    /// Number of integers covered.
    pub fn len(&self) -> i64 {
        (self.high - self.low + 1).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.high < self.low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkMessage {
    pub worker_id: usize,
    pub interval: WorkInterval,
    /// Wall time the worker spent on `interval`.
    #[serde(default)]
    pub seconds: f64,
    #[serde(default)]
    pub result: Option<LeafSums>,
    /// Set by the coordinator to tell the worker to exit.
    #[serde(default)]
    pub finished: bool,
}

impl WorkMessage {
    pub fn assign(worker_id: usize, interval: WorkInterval) -> Self {
        WorkMessage {
            worker_id,
            interval,
            seconds: 0.0,
            result: None,
            finished: false,
        }
    }

    pub fn stop(worker_id: usize) -> Self {
        WorkMessage {
            worker_id,
            interval: WorkInterval {
                low: 0,
                high: -1,
                segment_size: 0,
                segments_per_thread: 0,
            },
            seconds: 0.0,
            result: None,
            finished: true,
        }
    }

    /// Reuse a completion message for the next assignment.
    pub fn reassign(&mut self, interval: WorkInterval) {
        self.interval = interval;
        self.seconds = 0.0;
        self.result = None;
        self.finished = false;
    }

    pub fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).context("encoding work message")
    }

    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim_end())
            .with_context(|| format!("decoding work message {:?}", truncate(line, 80)))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
