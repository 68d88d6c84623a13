//! # S1 — Ordinary Leaves
//!
//! `S1 = Σ μ(n) · φ(x / n, c)` over the square-free `n ≤ y` whose least
//! prime factor exceeds `p_c`. Every term is a tiny-phi lookup, so the sum
//! is a single parallel pass over the tables.

use rayon::prelude::*;

use crate::phi::tiny_phi;
use crate::sieve::Tables;

pub fn s1(x: i128, y: i64, c: usize, tables: &Tables) -> i128 {
    let pc = tables.primes[c];
    (1..=y as usize)
        .into_par_iter()
        .filter(|&n| tables.mu[n] != 0 && tables.lpf[n] > pc)
        .map(|n| tables.mu[n] as i128 * tiny_phi(x / n as i128, c))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_n_equal_one_when_y_below_next_prime() {
        // y = 12 < p_6 = 13: the only admissible n is 1.
        let t = Tables::new(12);
        assert_eq!(s1(1000, 12, 5, &t), tiny_phi(1000, 5));
    }

    #[test]
    fn known_small_sum() {
        // x = 1000, y = 20, c = 2 (primes 2, 3):
        // n in {1, 5, 7, 11, 13, 17, 19} with μ = {1, -1, -1, -1, -1, -1, -1}
        let t = Tables::new(20);
        let expected = tiny_phi(1000, 2)
            - [5i128, 7, 11, 13, 17, 19]
                .iter()
                .map(|&n| tiny_phi(1000 / n, 2))
                .sum::<i128>();
        assert_eq!(s1(1000, 20, 2, &t), expected);
    }
}
