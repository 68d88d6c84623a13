//! # Sieve — Lookup Tables up to y
//!
//! Produces the read-only tables every stage of the computation consumes:
//!
//! 1. **Primes** `≤ y`, 1-indexed with a `0` sentinel at index 0, so that
//!    `primes[b]` is the b-th prime.
//! 2. **Möbius** `μ(n)` for `n ≤ y`.
//! 3. **Least prime factor** `lpf(n)` for `n ≤ y`, with `lpf(1) = u32::MAX`
//!    so that `p < lpf(1)` holds for every prime.
//! 4. **Prime-counting lookup** `π(n)` for `n ≤ y`.
//!
//! All four come out of one linear (Euler) sieve pass: each composite is
//! visited exactly once, by its least prime factor. Complexity: O(y) time and
//! space.
//!
//! The bundled [`Tables`] handle is built once before any parallel work and
//! only ever borrowed immutably afterwards, so worker threads share it without
//! synchronization.

/// Read-only tables for one computation, indexed `0..=y`.
#[derive(Debug, Clone)]
pub struct Tables {
    pub y: i64,
    pub primes: Vec<u32>,
    pub mu: Vec<i8>,
    pub lpf: Vec<u32>,
    pub pi: Vec<u32>,
}

impl Tables {
    pub fn new(y: i64) -> Self {
        assert!(y >= 1 && y <= u32::MAX as i64 / 2, "table bound y={} out of range", y);
        let n = y as usize;
        let mut lpf = vec![0u32; n + 1];
        let mut mu = vec![0i8; n + 1];
        let mut primes: Vec<u32> = Vec::with_capacity(estimate_prime_count(n) + 1);
        primes.push(0);
        mu[1] = 1;

        for i in 2..=n {
            if lpf[i] == 0 {
                lpf[i] = i as u32;
                mu[i] = -1;
                primes.push(i as u32);
            }
            let lpf_i = lpf[i];
            for &p in &primes[1..] {
                let m = i * p as usize;
                if p > lpf_i || m > n {
                    break;
                }
                lpf[m] = p;
                mu[m] = if p == lpf_i { 0 } else { -mu[i] };
            }
        }
        lpf[1] = u32::MAX;

        let mut pi = vec![0u32; n + 1];
        let mut count = 0u32;
        for (i, slot) in pi.iter_mut().enumerate().skip(2) {
            if lpf[i] == i as u32 {
                count += 1;
            }
            *slot = count;
        }

        Tables {
            y,
            primes,
            mu,
            lpf,
            pi,
        }
    }

    /// π(y), the index of the largest prime in the table.
    pub fn pi_y(&self) -> usize {
        self.primes.len() - 1
    }
}

/// Primes `≤ y`, 1-indexed with a leading `0` sentinel.
pub fn primes(y: i64) -> Vec<u32> {
    Tables::new(y).primes
}

/// Möbius function over `0..=y` (`μ(0)` is unused and stored as 0).
pub fn mobius(y: i64) -> Vec<i8> {
    Tables::new(y).mu
}

/// Least prime factor over `0..=y`, `lpf(1) = u32::MAX`.
pub fn least_prime_factor(y: i64) -> Vec<u32> {
    Tables::new(y).lpf
}

/// π(n) for every `n` in `0..=y`.
pub fn prime_count_lookup(y: i64) -> Vec<u32> {
    Tables::new(y).pi
}

/// Generate all primes up to `limit` with an odd-only sieve of Eratosthenes.
///
/// Index `i` of the sieve array stands for the odd number `2i + 1`.
pub fn generate_primes(limit: u64) -> Vec<u64> {
    if limit < 2 {
        return vec![];
    }
    let size = (limit as usize - 1) / 2 + 1;
    let mut composite = vec![false; size];
    let mut primes = Vec::with_capacity(estimate_prime_count(limit as usize));
    primes.push(2);

    let mut i = 1;
    while (2 * i + 1) * (2 * i + 1) <= limit as usize {
        if !composite[i] {
            let p = 2 * i + 1;
            let mut j = p * p / 2;
            while j < size {
                composite[j] = true;
                j += p;
            }
        }
        i += 1;
    }

    primes.extend(
        composite
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, &c)| !c)
            .map(|(i, _)| (2 * i + 1) as u64),
    );
    primes
}

/// Upper estimate of π(n), used to pre-size prime vectors.
fn estimate_prime_count(n: usize) -> usize {
    if n < 10 {
        return 4;
    }
    let nf = n as f64;
    (1.3 * nf / nf.ln()) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primes_are_one_indexed_with_sentinel() {
        let p = primes(30);
        assert_eq!(p, vec![0, 2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn mobius_known_values() {
        let mu = mobius(30);
        // n:          1  2   3  4   5  6   7  8  9  10
        let expected = [1, -1, -1, 0, -1, 1, -1, 0, 0, 1];
        assert_eq!(&mu[1..=10], &expected);
        assert_eq!(mu[30], -1); // 2*3*5
        assert_eq!(mu[12], 0);
    }

    #[test]
    fn least_prime_factor_known_values() {
        let lpf = least_prime_factor(100);
        assert_eq!(lpf[1], u32::MAX);
        assert_eq!(lpf[2], 2);
        assert_eq!(lpf[9], 3);
        assert_eq!(lpf[35], 5);
        assert_eq!(lpf[49], 7);
        assert_eq!(lpf[97], 97);
        assert_eq!(lpf[91], 7);
    }

    #[test]
    fn prime_count_lookup_matches_prime_list() {
        let t = Tables::new(10_000);
        assert_eq!(t.pi[0], 0);
        assert_eq!(t.pi[1], 0);
        assert_eq!(t.pi[2], 1);
        assert_eq!(t.pi[100], 25);
        assert_eq!(t.pi[10_000], 1229);
        assert_eq!(t.pi_y(), 1229);
        for (b, &p) in t.primes.iter().enumerate().skip(1) {
            assert_eq!(t.pi[p as usize] as usize, b);
        }
    }

    #[test]
    fn mobius_is_multiplicative_on_coprime_pairs() {
        let t = Tables::new(2_000);
        for a in 1..40usize {
            for b in 1..40usize {
                if gcd(a, b) == 1 && a * b <= 2_000 {
                    assert_eq!(t.mu[a * b], t.mu[a] * t.mu[b], "mu({}*{})", a, b);
                }
            }
        }
    }

    fn gcd(mut a: usize, mut b: usize) -> usize {
        while b != 0 {
            (a, b) = (b, a % b);
        }
        a
    }

    #[test]
    fn generate_primes_small_limits() {
        assert!(generate_primes(0).is_empty());
        assert!(generate_primes(1).is_empty());
        assert_eq!(generate_primes(2), vec![2]);
        assert_eq!(generate_primes(3), vec![2, 3]);
        assert_eq!(generate_primes(10), vec![2, 3, 5, 7]);
        assert_eq!(generate_primes(25), vec![2, 3, 5, 7, 11, 13, 17, 19, 23]);
    }

    #[test]
    fn generate_primes_known_count() {
        assert_eq!(generate_primes(1_000_000).len(), 78_498);
    }

    #[test]
    fn generate_primes_agrees_with_tables() {
        let from_tables: Vec<u64> = primes(5_000)[1..].iter().map(|&p| p as u64).collect();
        assert_eq!(generate_primes(5_000), from_tables);
    }
}
