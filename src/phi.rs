//! # Phi — Partial Sieve Function
//!
//! `φ(x, a)` counts the integers in `[1, x]` with no prime factor among the
//! first `a` primes.
//!
//! For `a ≤ 6` the count is periodic modulo the primorial `p_a#` and is
//! answered in O(1) from a precomputed residue table ("tiny phi"):
//!
//! ```text
//! φ(x, a) = (x / p_a#) · φ(p_a#) + φ(x mod p_a#, a)
//! ```
//!
//! The largest table (a = 6, 30030 entries) is built lazily on first use.
//! For larger `a` the classic Legendre recurrence
//! `φ(x, a) = φ(x, a−1) − φ(x / p_a, a−1)` bottoms out in the tiny tables.

use std::sync::OnceLock;

use crate::sieve::generate_primes;

/// Largest `a` served by the tiny tables.
pub const MAX_A: usize = 6;

const TINY_PRIMES: [i128; MAX_A + 1] = [0, 2, 3, 5, 7, 11, 13];
const PRIMORIALS: [i128; MAX_A + 1] = [1, 2, 6, 30, 210, 2310, 30030];
const TOTIENTS: [i128; MAX_A + 1] = [1, 1, 2, 8, 48, 480, 5760];

/// Residue tables: `tables[a][r] = φ(r, a)` for `r < p_a#`.
struct PhiTiny {
    tables: Vec<Vec<u16>>,
}

impl PhiTiny {
    fn new() -> Self {
        let mut tables = Vec::with_capacity(MAX_A + 1);
        for a in 0..=MAX_A {
            let pp = PRIMORIALS[a] as usize;
            let mut table = Vec::with_capacity(pp);
            let mut count = 0u16;
            for r in 0..pp {
                if r > 0 && TINY_PRIMES[1..=a].iter().all(|&p| r as i128 % p != 0) {
                    count += 1;
                }
                table.push(count);
            }
            tables.push(table);
        }
        PhiTiny { tables }
    }

    fn get() -> &'static PhiTiny {
        static INSTANCE: OnceLock<PhiTiny> = OnceLock::new();
        INSTANCE.get_or_init(PhiTiny::new)
    }
}

/// Number of tiny primes `≤ y`, capped at [`MAX_A`]. Prime indices up to this
/// cutoff are sieved directly, without counter maintenance.
pub fn tiny_phi_cutoff(y: i64) -> usize {
    TINY_PRIMES[1..]
        .iter()
        .take_while(|&&p| p <= y as i128)
        .count()
}

/// `φ(n, c)` for `c ≤ 6` in constant time.
pub fn tiny_phi(n: i128, c: usize) -> i128 {
    assert!(c <= MAX_A, "tiny_phi called with c={} > {}", c, MAX_A);
    if n <= 0 {
        return 0;
    }
    let pp = PRIMORIALS[c];
    let table = &PhiTiny::get().tables[c];
    (n / pp) * TOTIENTS[c] + table[(n % pp) as usize] as i128
}

/// General `φ(x, a)` by the Legendre recurrence.
///
/// `primes` is 1-indexed (sentinel at 0) and must contain at least `a` primes.
pub fn phi(x: i128, a: usize, primes: &[u32]) -> i128 {
    if x < 1 {
        return 0;
    }
    if a <= MAX_A {
        return tiny_phi(x, a);
    }
    assert!(a < primes.len(), "phi needs {} primes, table has {}", a, primes.len() - 1);
    if x <= primes[a] as i128 {
        return 1;
    }

    // φ(x, a) = φ(x, 6) − Σ_{i=7..a} φ(x / p_i, i − 1)
    let mut sum = tiny_phi(x, MAX_A);
    for i in MAX_A + 1..=a {
        let p = primes[i] as i128;
        let xp = x / p;
        if xp == 0 {
            break;
        }
        // Below p_i only 1 survives sieving by the first i-1 primes.
        sum -= if xp < p { 1 } else { phi(xp, i - 1, primes) };
    }
    sum
}

/// `φ(x, a)` for any `a`, generating the first `a` primes as needed.
pub fn phi_of(x: i128, a: usize) -> i128 {
    if x < 1 {
        return 0;
    }
    if a <= MAX_A {
        return tiny_phi(x, a);
    }
    let mut limit: u64 = 1 << 10;
    loop {
        let found = generate_primes(limit);
        if found.len() >= a {
            let mut primes = Vec::with_capacity(a + 1);
            primes.push(0u32);
            primes.extend(found[..a].iter().map(|&p| p as u32));
            return phi(x, a, &primes);
        }
        // Every prime <= x is among the first a, so only 1 survives.
        if limit as i128 >= x {
            return 1;
        }
        limit = limit.saturating_mul(2);
    }
}
