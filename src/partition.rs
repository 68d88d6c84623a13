//! # Partition — Thread-Level Split and Ordered Merge
//!
//! Splits `[low, limit)` into `T` contiguous chunks of whole segments, runs
//! one [`accumulate`] per chunk on the rayon pool, then folds the chunk
//! records left to right with [`LeafSums::absorb`].
//!
//! ```text
//! [low ............................................ limit)
//!  | chunk 0 | chunk 1 | chunk 2 | ... | chunk T-1 |
//!      |         |         |                |
//!   accumulate accumulate accumulate     accumulate   (parallel, no shared state)
//!      \_________\_________\________________/
//!                  ordered fold                        (sequential, ascending)
//! ```
//!
//! The fold is the only step that needs results from other chunks: chunk `i`
//! needs the survivor counts of chunks `0..i` to complete its leaves, so it
//! runs strictly in chunk order after every chunk has finished.

use rayon::prelude::*;
use tracing::debug;

use crate::leaves::{accumulate, LeafContext, LeafSums};
use crate::pmath::{ceil_div, ideal_num_threads, in_between, isqrt, next_power_of_two, THREAD_THRESHOLD};
use crate::progress::Progress;
use crate::sieve::Tables;

/// Result of one partitioned run.
#[derive(Debug, Clone)]
pub struct Partition {
    pub sums: LeafSums,
    pub threads: usize,
    pub segments_per_thread: i64,
}

/// Power-of-two segment size `≥ √limit`.
pub fn default_segment_size(limit: i64) -> i64 {
    next_power_of_two(isqrt(limit.max(1) as i128) as i64)
}

/// Compute the special-leaf record of `[low, limit)` on up to `threads` threads.
pub fn partition(
    ctx: &LeafContext,
    low: i64,
    limit: i64,
    segment_size: i64,
    threads: usize,
) -> Partition {
    assert!(segment_size > 0 && (segment_size as u64).is_power_of_two());
    if low >= limit {
        return Partition {
            sums: LeafSums::default(),
            threads: 1,
            segments_per_thread: 0,
        };
    }

    let segments = ceil_div(limit - low, segment_size);
    let threads = in_between(1, threads as i64, segments);
    let segments_per_thread = ceil_div(segments, threads);
    let chunk_len = segment_size * segments_per_thread;

    let chunks: Vec<LeafSums> = (0..threads)
        .into_par_iter()
        .map(|i| {
            let start = low + chunk_len * i;
            let end = (start + chunk_len).min(limit);
            if start >= end {
                LeafSums::default()
            } else {
                accumulate(ctx, start, end, segment_size)
            }
        })
        .collect();

    debug!(
        low,
        limit,
        segment_size,
        threads,
        segments_per_thread,
        "chunks finished, merging"
    );

    Partition {
        sums: merge(chunks),
        threads: threads as usize,
        segments_per_thread,
    }
}

/// Fold chunk records in ascending order.
pub fn merge(chunks: Vec<LeafSums>) -> LeafSums {
    chunks.into_iter().fold(LeafSums::default(), |mut acc, chunk| {
        acc.absorb(chunk);
        acc
    })
}

/// S2 over the whole line `[1, x/y]`.
pub fn s2(
    x: i128,
    y: i64,
    c: usize,
    tables: &Tables,
    threads: usize,
    progress: Option<&Progress>,
) -> i128 {
    let mut ctx = LeafContext::new(x, y, c, tables);
    if let Some(p) = progress {
        ctx = ctx.with_progress(p);
    }
    let limit = ctx.limit();
    let threads = ideal_num_threads(threads, limit, THREAD_THRESHOLD);
    let segment_size = default_segment_size(limit);
    partition(&ctx, 1, limit, segment_size, threads).sums.sum
}
