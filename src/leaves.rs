//! # Leaves — Special-Leaf Accumulation (S2)
//!
//! Computes the contribution of the special leaves
//!
//! ```text
//! S2 = − Σ μ(m) · φ(x / (p_b · m), b − 1)
//!        over c < b < π(y),  y / p_b < m ≤ y,  μ(m) ≠ 0,  p_b < lpf(m)
//! ```
//!
//! by sieving the integer line `[1, x/y]` segment by segment and reading each
//! `φ(x/n, b−1)` off the [`PrefixCounter`](crate::counter::PrefixCounter)
//! while the multiples of the first `b − 1` primes are removed.
//!
//! ## Partial Sums
//!
//! A run over a sub-range `[low, limit)` only sees the survivors inside its
//! own range, so its raw sum is short by `Σ_b phi_before[b] · mu_sum[b]`,
//! where `phi_before[b]` counts the survivors left of `low`. The
//! [`LeafSums`] record keeps exactly what is needed to add that term back
//! later: the raw sum, the per-prime-index survivor counts (`phi`) and the
//! per-prime-index Möbius sums (`mu_sum`). [`LeafSums::absorb`] folds the
//! record of the next range into the running record; applying it in
//! ascending range order reproduces the sequential result exactly.

use serde::{Deserialize, Serialize};

use crate::pmath::isqrt;
use crate::progress::Progress;
use crate::segment::SegmentSieve;
use crate::sieve::Tables;
use crate::phi;

/// Mergeable partial result of the special-leaf sum over one range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafSums {
    #[serde(with = "i128_string")]
    pub sum: i128,
    pub phi: Vec<i64>,
    pub mu_sum: Vec<i64>,
}

impl LeafSums {
    /// Fold in the record of the range immediately to the right of `self`.
    ///
    /// `self.phi` must already be cumulative over everything left of `next`.
    pub fn absorb(&mut self, next: LeafSums) {
        let len = next.phi.len().max(next.mu_sum.len());
        if self.phi.len() < len {
            self.phi.resize(len, 0);
            self.mu_sum.resize(len, 0);
        }
        self.sum += next.sum;
        for (j, &mu) in next.mu_sum.iter().enumerate() {
            self.sum += self.phi[j] as i128 * mu as i128;
            self.mu_sum[j] += mu;
        }
        for (j, &count) in next.phi.iter().enumerate() {
            self.phi[j] += count;
        }
    }
}

/// Read-only inputs shared by every accumulator of one computation.
#[derive(Clone, Copy)]
pub struct LeafContext<'a> {
    pub x: i128,
    pub y: i64,
    pub c: usize,
    pub tables: &'a Tables,
    pub progress: Option<&'a Progress>,
}

impl<'a> LeafContext<'a> {
    pub fn new(x: i128, y: i64, c: usize, tables: &'a Tables) -> Self {
        assert!(y > 0 && y == tables.y, "tables built for y={}, context y={}", tables.y, y);
        assert!(c >= 2, "small-prime cutoff c={} must be at least 2", c);
        LeafContext {
            x,
            y,
            c,
            tables,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Exclusive upper end of the sieved integer line, `x / y + 1`.
    pub fn limit(&self) -> i64 {
        (self.x / self.y as i128) as i64 + 1
    }
}

/// Special-leaf partial sums for `[low, limit)`, sieved in windows of
/// `segment_size` integers (a power of two).
pub fn accumulate(ctx: &LeafContext, mut low: i64, limit: i64, segment_size: i64) -> LeafSums {
    let LeafContext { x, y, c, tables, .. } = *ctx;
    let primes = &tables.primes;
    let mu = &tables.mu;
    let lpf = &tables.lpf;

    // Leaves with x/n >= low need p_b < sqrt(x / low).
    let max_prime = isqrt(x / low as i128).min(y as i128) as usize;
    let size = tables.pi[max_prime] as usize + 1;
    let pi_y = tables.pi_y();

    if c >= size - 1 || low >= limit {
        return LeafSums::default();
    }

    let mut sieve = SegmentSieve::new(&primes[..size], low, segment_size as usize);
    let mut phi = vec![0i64; size];
    let mut mu_sum = vec![0i64; size];
    let mut sum: i128 = 0;
    let mut leaves = 0u64;
    let mut segments = 0u64;

    while low < limit {
        let high = (low + segment_size).min(limit);
        sieve.reset(low, high);
        sieve.cross_off_small_primes(c);
        sieve.build_counter();

        for b in c + 1..pi_y.min(size) {
            let prime = primes[b] as i128;
            let min_m = (x / (prime * high as i128))
                .max(y as i128 / prime)
                .min(y as i128) as i64;
            let max_m = (x / (prime * low as i128)).min(y as i128) as i64;

            // lpf(m) <= m, so no m <= prime passes the admissibility test.
            if prime >= max_m as i128 {
                break;
            }

            for m in (min_m + 1..=max_m).rev() {
                let m = m as usize;
                if mu[m] != 0 && (prime as u32) < lpf[m] {
                    let xn = (x / (prime * m as i128)) as i64;
                    let count = sieve.count(xn - low);
                    let phi_xn = phi[b] + count;
                    sum -= mu[m] as i128 * phi_xn as i128;
                    mu_sum[b] -= mu[m] as i64;
                    leaves += 1;
                }
            }

            phi[b] += sieve.count(high - 1 - low);
            sieve.cross_off_and_count(b);
        }

        segments += 1;
        low += segment_size;
    }

    if let Some(progress) = ctx.progress {
        progress.record(segments, leaves);
    }

    LeafSums { sum, phi, mu_sum }
}

/// Special-leaf sum by direct enumeration of every admissible `(p_b, m)`
/// pair, each `φ` evaluated with the Legendre recurrence. Slow; used to
/// verify the segmented kernel.
pub fn s2_reference(x: i128, y: i64, c: usize, tables: &Tables) -> i128 {
    let primes = &tables.primes;
    let mut s2 = 0i128;

    for b in c + 1..tables.pi_y() {
        let prime = primes[b] as i64;
        for m in y / prime + 1..=y {
            let m = m as usize;
            if tables.mu[m] != 0 && (prime as u32) < tables.lpf[m] {
                let n = prime as i128 * m as i128;
                s2 -= tables.mu[m] as i128 * phi::phi(x / n, b - 1, primes);
            }
        }
    }
    s2
}

/// Serde adapter keeping 128-bit integers exact in JSON.
pub(crate) mod i128_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
