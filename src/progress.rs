//! # Progress — Atomic Computation Counters
//!
//! Lock-free counters shared between the rayon chunks of the special-leaf
//! kernel and a background status reporter. Each chunk adds its totals once,
//! when it finishes, so the atomics see very little contention. A Mutex holds
//! the current stage label (updated a handful of times per run).
//!
//! ## Background Reporter
//!
//! A dedicated thread logs progress every `interval`: segments sieved,
//! special leaves found, leaf rate and the current stage. It polls the
//! `shutdown` flag in short ticks, so `stop()` followed by `join()` returns
//! promptly.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

pub struct Progress {
    pub segments: AtomicU64,
    pub leaves: AtomicU64,
    pub current: Mutex<String>,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Progress {
            segments: AtomicU64::new(0),
            leaves: AtomicU64::new(0),
            current: Mutex::new(String::new()),
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Add the totals of one finished chunk.
    pub fn record(&self, segments: u64, leaves: u64) {
        self.segments.fetch_add(segments, Ordering::Relaxed);
        self.leaves.fetch_add(leaves, Ordering::Relaxed);
    }

    pub fn set_stage(&self, stage: &str) {
        if let Ok(mut current) = self.current.lock() {
            *current = stage.to_string();
        }
    }

    pub fn start_reporter(self: &Arc<Self>, interval: Duration) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        let tick = Duration::from_millis(100).min(interval);
        thread::spawn(move || {
            let mut last = Instant::now();
            loop {
                thread::sleep(tick);
                if progress.shutdown.load(Ordering::Relaxed) {
                    break;
                }
                if last.elapsed() >= interval {
                    progress.print_status();
                    last = Instant::now();
                }
            }
        })
    }

    pub fn print_status(&self) {
        let elapsed = self.start.elapsed();
        let segments = self.segments.load(Ordering::Relaxed);
        let leaves = self.leaves.load(Ordering::Relaxed);
        let current = self
            .current
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default();
        let rate = if elapsed.as_secs() > 0 {
            leaves as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let h = elapsed.as_secs() / 3600;
        let m = (elapsed.as_secs() % 3600) / 60;
        let s = elapsed.as_secs() % 60;
        info!(
            stage = %current,
            segments,
            leaves,
            rate = format_args!("{:.2}", rate),
            elapsed = format_args!("{:02}:{:02}:{:02}", h, m, s),
            "progress"
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let p = Progress::new();
        assert_eq!(p.segments.load(Ordering::Relaxed), 0);
        assert_eq!(p.leaves.load(Ordering::Relaxed), 0);
        assert_eq!(*p.current.lock().unwrap(), "");
    }

    #[test]
    fn record_adds_both_counters() {
        let p = Progress::new();
        p.record(3, 100);
        p.record(2, 50);
        assert_eq!(p.segments.load(Ordering::Relaxed), 5);
        assert_eq!(p.leaves.load(Ordering::Relaxed), 150);
    }

    /// 8 threads x 1000 records must land exactly; Relaxed fetch_add loses nothing.
    #[test]
    fn concurrent_records_are_accurate() {
        let p = Progress::new();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        p.record(1, 2);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(p.segments.load(Ordering::Relaxed), 8000);
        assert_eq!(p.leaves.load(Ordering::Relaxed), 16000);
    }

    #[test]
    fn stage_label_updates() {
        let p = Progress::new();
        p.set_stage("S2");
        assert_eq!(*p.current.lock().unwrap(), "S2");
    }

    #[test]
    fn print_status_with_zero_elapsed() {
        let p = Progress::new();
        p.print_status();
    }

    #[test]
    fn reporter_exits_after_stop() {
        let p = Progress::new();
        let handle = p.start_reporter(Duration::from_millis(20));
        thread::sleep(Duration::from_millis(50));
        p.stop();
        handle.join().unwrap();
    }
}
