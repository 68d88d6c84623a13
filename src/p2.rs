//! # P2 — Two-Prime Correction
//!
//! `P2(x, y)` counts the integers `≤ x` with exactly two prime factors, both
//! larger than `y`:
//!
//! ```text
//! P2 = Σ_{a < i ≤ b} (π(x / p_i) − (i − 1)),   a = π(y), b = π(√x)
//! ```
//!
//! The targets `x / p_i` grow as `i` falls, so one segmented prime-counting
//! sieve over `[0, x/y]` resolves all of them in a single left-to-right pass.

use tracing::debug;

use crate::pmath::isqrt;
use crate::sieve::generate_primes;

/// Segment length for the counting sieve (in integers).
const SEGMENT_SIZE: i64 = 1 << 16;

pub fn p2(x: i128, y: i64) -> i128 {
    let sqrtx = isqrt(x) as i64;
    if y >= sqrtx {
        return 0;
    }

    let primes = generate_primes(sqrtx as u64);
    let a = primes.partition_point(|&p| p as i64 <= y);
    let b = primes.len();
    if a >= b {
        return 0;
    }

    let limit = (x / y as i128) as i64;
    let sieving_primes = generate_primes(isqrt(limit as i128) as u64);
    let target = |i: usize| (x / primes[i - 1] as i128) as i64;

    let mut sum: i128 = 0;
    let mut i = b;
    let mut pi_low: i64 = 0;
    let mut is_prime = vec![true; SEGMENT_SIZE as usize];
    let mut low = 0i64;

    while low <= limit && i > a {
        let high = (low + SEGMENT_SIZE).min(limit + 1);
        let len = (high - low) as usize;
        is_prime[..len].fill(true);
        for n in low..high.min(2) {
            is_prime[(n - low) as usize] = false;
        }
        for &p in &sieving_primes {
            let p = p as i64;
            if p * p >= high {
                break;
            }
            let mut k = (p * p).max((low + p - 1) / p * p);
            while k < high {
                is_prime[(k - low) as usize] = false;
                k += p;
            }
        }

        let mut count = pi_low;
        let mut pos = low;
        while i > a && target(i) < high {
            let t = target(i);
            while pos <= t {
                count += is_prime[(pos - low) as usize] as i64;
                pos += 1;
            }
            sum += (count - (i as i64 - 1)) as i128;
            i -= 1;
        }
        while pos < high {
            count += is_prime[(pos - low) as usize] as i64;
            pos += 1;
        }
        pi_low = count;
        low = high;
    }

    debug!(y, a, b, limit, "P2 finished");
    sum
}
