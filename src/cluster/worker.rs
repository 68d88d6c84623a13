//! Worker side of the cluster: compute each assigned interval and report.

use std::io::{BufRead, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::message::WorkMessage;
use crate::leaves::LeafContext;
use crate::partition::partition;

/// Compute the special-leaf record of the interval in `msg` and fill in the
/// completion fields.
pub fn process(ctx: &LeafContext, threads: usize, mut msg: WorkMessage) -> WorkMessage {
    let start = Instant::now();
    let interval = msg.interval;
    let segment_size = interval.segment_size.max(1) as u64;
    let segment_size = segment_size.next_power_of_two() as i64;

    let run = partition(ctx, interval.low, interval.high + 1, segment_size, threads);

    msg.interval.segments_per_thread = run.segments_per_thread.max(1);
    msg.seconds = start.elapsed().as_secs_f64();
    msg.result = Some(run.sums);
    debug!(
        worker = msg.worker_id,
        low = interval.low,
        high = interval.high,
        seconds = msg.seconds,
        "interval done"
    );
    msg
}

/// Answer assignments until a stop message arrives or the input ends.
/// Returns the number of intervals computed.
pub fn serve<I, F>(ctx: &LeafContext, threads: usize, incoming: I, mut reply: F) -> Result<usize>
where
    I: IntoIterator<Item = Result<WorkMessage>>,
    F: FnMut(WorkMessage) -> Result<()>,
{
    let mut done = 0;
    for msg in incoming {
        let msg = msg?;
        if msg.finished {
            break;
        }
        reply(process(ctx, threads, msg))?;
        done += 1;
    }
    Ok(done)
}

/// Serve newline-delimited JSON assignments on `input`, answering on `output`.
pub fn serve_lines<R: BufRead, W: Write>(
    ctx: &LeafContext,
    threads: usize,
    input: R,
    mut output: W,
) -> Result<usize> {
    let incoming = input
        .lines()
        .map(|line| WorkMessage::from_line(&line.context("reading assignment")?));
    let done = serve(ctx, threads, incoming, |msg| {
        writeln!(output, "{}", msg.to_line()?).context("writing completion")?;
        output.flush().context("flushing completion")
    })?;
    info!(intervals = done, "worker exiting");
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::message::WorkInterval;
    use crate::leaves::accumulate;
    use crate::phi::tiny_phi_cutoff;
    use crate::sieve::Tables;

    fn interval(low: i64, high: i64) -> WorkInterval {
        WorkInterval {
            low,
            high,
            segment_size: 128,
            segments_per_thread: 1,
        }
    }

    #[test]
    fn process_covers_inclusive_high() {
        let (x, y) = (1_000_000i128, 150i64);
        let tables = Tables::new(y);
        let ctx = LeafContext::new(x, y, tiny_phi_cutoff(y), &tables);
        let msg = process(&ctx, 2, WorkMessage::assign(4, interval(1, 999)));
        assert_eq!(msg.worker_id, 4);
        assert!(msg.interval.segments_per_thread >= 1);
        assert_eq!(msg.result.unwrap().sum, accumulate(&ctx, 1, 1_000, 128).sum);
    }

    #[test]
    fn serve_lines_stops_on_finished() {
        let (x, y) = (1_000_000i128, 150i64);
        let tables = Tables::new(y);
        let ctx = LeafContext::new(x, y, tiny_phi_cutoff(y), &tables);
        let input = format!(
            "{}\n{}\n{}\n",
            WorkMessage::assign(0, interval(1, 500)).to_line().unwrap(),
            WorkMessage::stop(0).to_line().unwrap(),
            WorkMessage::assign(0, interval(501, 900)).to_line().unwrap(),
        );
        let mut out = Vec::new();
        let done = serve_lines(&ctx, 1, input.as_bytes(), &mut out).unwrap();
        assert_eq!(done, 1);

        let text = String::from_utf8(out).unwrap();
        let replies: Vec<WorkMessage> = text.lines().map(|l| WorkMessage::from_line(l).unwrap()).collect();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].interval.low, 1);
        assert!(replies[0].result.is_some());
    }

    #[test]
    fn serve_rejects_malformed_input() {
        let tables = Tables::new(50);
        let ctx = LeafContext::new(100_000, 50, 6, &tables);
        let mut out = Vec::new();
        assert!(serve_lines(&ctx, 1, "{\"worker_id\":\n".as_bytes(), &mut out).is_err());
    }
}
