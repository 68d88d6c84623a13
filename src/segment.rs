//! # Segment — Windowed Sieve with Counter Maintenance
//!
//! Owns one window `[low, high)` of the integer line at a time, its liveness
//! flags and the [`PrefixCounter`] derived from them. Each prime index `b`
//! keeps a "next multiple" cursor in a plain `Vec<i64>` indexed by `b`; the
//! cursor is seeded once with the first multiple `≥ low` and afterwards only
//! moves forward, so sieving progress carries from one segment to the next
//! without recomputation.
//!
//! Two crossing-off modes:
//!
//! - **Small primes** (`b ≤ c`): plain array writes, done before the counter
//!   is built. Prime index 1 is the prime 2, so evens are gone afterwards.
//! - **Counted primes** (`b > c`): only odd multiples are visited (step `2p`),
//!   and every newly dead position is removed from the counter.

use crate::counter::PrefixCounter;

pub struct SegmentSieve<'a> {
    primes: &'a [u32],
    low: i64,
    high: i64,
    alive: Vec<bool>,
    counter: PrefixCounter,
    next: Vec<i64>,
}

impl<'a> SegmentSieve<'a> {
    /// Sieve for segments of `segment_size` integers starting at `low`.
    ///
    /// `primes` is the 1-indexed prime table truncated to the prime indices
    /// this sieve will ever cross off.
    pub fn new(primes: &'a [u32], low: i64, segment_size: usize) -> Self {
        assert!(low >= 1, "segments start at 1 or later, got {}", low);
        let next = primes
            .iter()
            .enumerate()
            .map(|(b, &p)| {
                if b == 0 {
                    0
                } else {
                    let p = p as i64;
                    (low + p - 1) / p * p
                }
            })
            .collect();

        SegmentSieve {
            primes,
            low,
            high: low,
            alive: vec![true; segment_size],
            counter: PrefixCounter::new(segment_size),
            next,
        }
    }

    pub fn low(&self) -> i64 {
        self.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }

    /// Start the window `[low, high)` with every position alive.
    pub fn reset(&mut self, low: i64, high: i64) {
        debug_assert!(high > low && (high - low) as usize <= self.alive.len());
        debug_assert!(low >= self.high, "segments must advance left to right");
        self.low = low;
        self.high = high;
        self.alive.fill(true);
    }

    /// Remove multiples of the primes with index `1..=c` without counting.
    pub fn cross_off_small_primes(&mut self, c: usize) {
        for b in 1..=c {
            let prime = self.primes[b] as i64;
            let mut k = self.next[b];
            while k < self.high {
                self.alive[(k - self.low) as usize] = false;
                k += prime;
            }
            self.next[b] = k;
        }
    }

    /// Build the prefix counter from the current liveness flags.
    pub fn build_counter(&mut self) {
        self.counter.build(&self.alive);
    }

    /// Remove the odd multiples of `primes[b]`, keeping the counter in sync.
    pub fn cross_off_and_count(&mut self, b: usize) {
        let prime = self.primes[b] as i64;
        let next = self.next[b];
        debug_assert!(next >= self.low, "cursor of prime index {} fell behind", b);
        let mut k = next + prime * (!next & 1);

        while k < self.high {
            let offset = (k - self.low) as usize;
            if self.alive[offset] {
                self.alive[offset] = false;
                self.counter.deactivate(offset);
            }
            k += prime * 2;
        }
        self.next[b] = k;
    }

    /// Alive integers in `[low, low + offset]`.
    #[inline]
    pub fn count(&self, offset: i64) -> i64 {
        self.counter.query(offset as usize)
    }

    pub fn liveness(&self) -> &[bool] {
        &self.alive[..(self.high - self.low) as usize]
    }
}
