//! Transports between the coordinator and its workers.
//!
//! A [`WorkerPool`] is a set of workers addressed by index. Assignments go
//! to one worker; completions from all workers arrive on one queue. Two
//! implementations: [`LocalPool`] runs workers as threads in this process,
//! [`ProcessPool`] runs each worker as a `primepi worker` child process
//! talking JSON lines over its stdin and stdout.

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use super::message::WorkMessage;
use super::worker;
use crate::leaves::LeafContext;
use crate::sieve::Tables;

pub trait WorkerPool {
    /// Number of workers.
    fn len(&self) -> usize;

    /// Deliver `msg` to worker `msg.worker_id`.
    fn send(&mut self, msg: WorkMessage) -> Result<()>;

    /// Next completion from any worker, or `None` once `timeout` passes.
    /// A worker that dies while it still owes work is an error.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<WorkMessage>>;

    /// Wait for every worker to exit.
    fn shutdown(&mut self) -> Result<()>;
}

enum Event {
    Completed(WorkMessage),
    Lost { worker_id: usize, reason: String },
}

/// Shared receive side of both pools.
struct Inbox {
    rx: Receiver<Event>,
    stopped: HashSet<usize>,
}

impl Inbox {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<WorkMessage>> {
        loop {
            match self.rx.recv_timeout(timeout) {
                Ok(Event::Completed(msg)) => return Ok(Some(msg)),
                Ok(Event::Lost { worker_id, reason }) => {
                    if self.stopped.contains(&worker_id) {
                        continue;
                    }
                    bail!("worker {} lost: {}", worker_id, reason);
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => bail!("all workers disconnected"),
            }
        }
    }
}

/// Workers as threads of this process sharing one set of tables.
pub struct LocalPool {
    senders: Vec<Sender<WorkMessage>>,
    handles: Vec<Option<JoinHandle<()>>>,
    inbox: Inbox,
}

impl LocalPool {
    pub fn spawn(
        x: i128,
        y: i64,
        c: usize,
        tables: Arc<Tables>,
        workers: usize,
        threads_per_worker: usize,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let (tx, rx) = mpsc::channel::<WorkMessage>();
            let events = event_tx.clone();
            let tables = Arc::clone(&tables);
            let handle = thread::Builder::new()
                .name(format!("s2-worker-{}", worker_id))
                .spawn(move || {
                    let ctx = LeafContext::new(x, y, c, &tables);
                    let reply = |msg| {
                        events
                            .send(Event::Completed(msg))
                            .map_err(|_| anyhow!("coordinator hung up"))
                    };
                    if let Err(e) = worker::serve(&ctx, threads_per_worker, rx.into_iter().map(Ok), reply) {
                        let _ = events.send(Event::Lost {
                            worker_id,
                            reason: format!("{:#}", e),
                        });
                    }
                });
            match handle {
                Ok(h) => handles.push(Some(h)),
                Err(e) => warn!(worker_id, error = %e, "failed to start worker thread"),
            }
            senders.push(tx);
        }

        LocalPool {
            senders,
            handles,
            inbox: Inbox {
                rx: event_rx,
                stopped: HashSet::new(),
            },
        }
    }
}

impl WorkerPool for LocalPool {
    fn len(&self) -> usize {
        self.senders.len()
    }

    fn send(&mut self, msg: WorkMessage) -> Result<()> {
        let id = msg.worker_id;
        if msg.finished {
            self.inbox.stopped.insert(id);
        }
        let tx = self
            .senders
            .get(id)
            .ok_or_else(|| anyhow!("no worker {}", id))?;
        tx.send(msg).map_err(|_| anyhow!("worker {} has exited", id))
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<WorkMessage>> {
        self.inbox.recv_timeout(timeout)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.senders.clear();
        for handle in self.handles.iter_mut().filter_map(Option::take) {
            handle
                .join()
                .map_err(|_| anyhow!("worker thread panicked"))?;
        }
        Ok(())
    }
}

struct ChildWorker {
    child: Child,
    stdin: Option<ChildStdin>,
}

/// Workers as `primepi worker` child processes.
pub struct ProcessPool {
    workers: Vec<ChildWorker>,
    readers: Vec<JoinHandle<()>>,
    inbox: Inbox,
}

impl ProcessPool {
    /// Start `workers` children of `binary`, each computing `(x, y)` with
    /// `threads_per_worker` threads.
    pub fn spawn(
        binary: &Path,
        x: i128,
        y: i64,
        workers: usize,
        threads_per_worker: usize,
    ) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel();
        let mut children = Vec::with_capacity(workers);
        let mut readers = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let mut cmd = Command::new(binary);
            cmd.arg("--threads")
                .arg(threads_per_worker.to_string())
                .arg("worker")
                .arg("--x")
                .arg(x.to_string())
                .arg("--y")
                .arg(y.to_string());
            cmd.stdin(Stdio::piped());
            cmd.stdout(Stdio::piped());
            // Worker logs go to our stderr.
            cmd.stderr(Stdio::inherit());

            let mut child = cmd
                .spawn()
                .with_context(|| format!("spawning worker {} ({})", worker_id, binary.display()))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| anyhow!("worker {} has no stdout", worker_id))?;
            let stdin = child.stdin.take();

            let events = event_tx.clone();
            readers.push(thread::spawn(move || {
                let reason = read_completions(BufReader::new(stdout), &events);
                let _ = events.send(Event::Lost { worker_id, reason });
            }));
            info!(worker_id, pid = child.id(), "worker started");
            children.push(ChildWorker { child, stdin });
        }

        Ok(ProcessPool {
            workers: children,
            readers,
            inbox: Inbox {
                rx: event_rx,
                stopped: HashSet::new(),
            },
        })
    }
}

/// Forward completions until the stream ends; returns why it ended.
fn read_completions<R: BufRead>(reader: R, events: &Sender<Event>) -> String {
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => return format!("read error: {}", e),
        };
        if line.trim().is_empty() {
            continue;
        }
        match WorkMessage::from_line(&line) {
            Ok(msg) => {
                if events.send(Event::Completed(msg)).is_err() {
                    return "coordinator hung up".to_string();
                }
            }
            Err(e) => return format!("{:#}", e),
        }
    }
    "exited".to_string()
}

impl WorkerPool for ProcessPool {
    fn len(&self) -> usize {
        self.workers.len()
    }

    fn send(&mut self, msg: WorkMessage) -> Result<()> {
        let id = msg.worker_id;
        if msg.finished {
            self.inbox.stopped.insert(id);
        }
        let worker = self
            .workers
            .get_mut(id)
            .ok_or_else(|| anyhow!("no worker {}", id))?;
        let stdin = worker
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("worker {} input already closed", id))?;
        let line = msg.to_line()?;
        writeln!(stdin, "{}", line)
            .and_then(|_| stdin.flush())
            .with_context(|| format!("sending to worker {}", id))?;
        if msg.finished {
            worker.stdin = None;
        }
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<WorkMessage>> {
        self.inbox.recv_timeout(timeout)
    }

    fn shutdown(&mut self) -> Result<()> {
        let mut failed = Vec::new();
        for (id, worker) in self.workers.iter_mut().enumerate() {
            worker.stdin = None;
            let status = worker
                .child
                .wait()
                .with_context(|| format!("waiting for worker {}", id))?;
            if !status.success() {
                failed.push(format!("worker {}: {}", id, status));
            }
        }
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        if !failed.is_empty() {
            bail!("workers exited with errors: {}", failed.join(", "));
        }
        Ok(())
    }
}

impl Drop for ProcessPool {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            worker.stdin = None;
            if let Ok(None) = worker.child.try_wait() {
                let _ = worker.child.kill();
                let _ = worker.child.wait();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::message::WorkInterval;

    fn interval(low: i64, high: i64) -> WorkInterval {
        WorkInterval {
            low,
            high,
            segment_size: 64,
            segments_per_thread: 1,
        }
    }

    #[test]
    fn local_pool_answers_each_worker() {
        let y = 150;
        let tables = Arc::new(Tables::new(y));
        let mut pool = LocalPool::spawn(1_000_000, y, 6, tables, 2, 1);
        assert_eq!(pool.len(), 2);

        pool.send(WorkMessage::assign(0, interval(1, 100))).unwrap();
        pool.send(WorkMessage::assign(1, interval(101, 300))).unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            let msg = pool.recv_timeout(Duration::from_secs(30)).unwrap().unwrap();
            assert!(msg.result.is_some());
            seen.push(msg.worker_id);
        }
        seen.sort();
        assert_eq!(seen, vec![0, 1]);

        pool.send(WorkMessage::stop(0)).unwrap();
        pool.send(WorkMessage::stop(1)).unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn idle_pool_times_out() {
        let tables = Arc::new(Tables::new(50));
        let mut pool = LocalPool::spawn(100_000, 50, 6, tables, 1, 1);
        assert!(pool.recv_timeout(Duration::from_millis(20)).unwrap().is_none());
        pool.send(WorkMessage::stop(0)).unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn send_to_unknown_worker_fails() {
        let tables = Arc::new(Tables::new(50));
        let mut pool = LocalPool::spawn(100_000, 50, 6, tables, 1, 1);
        assert!(pool.send(WorkMessage::stop(5)).is_err());
        pool.send(WorkMessage::stop(0)).unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn truncated_stream_reports_reason() {
        let (tx, rx) = mpsc::channel();
        let reason = read_completions("{\"worker_id\": 1".as_bytes(), &tx);
        assert!(reason.contains("decoding work message"));
        assert!(rx.try_recv().is_err());
    }
}
