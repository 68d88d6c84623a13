//! # Pmath — Integer Helpers
//!
//! Exact integer roots and small arithmetic utilities shared by the sieve,
//! the special-leaf kernel and the load balancer. Roots are computed with a
//! floating-point estimate followed by an exact integer correction, so they
//! are correct over the whole `i128` range used for `x`.

/// Integer square root: the largest `r` with `r * r <= n`.
pub fn isqrt(n: i128) -> i128 {
    assert!(n >= 0, "isqrt of negative number {}", n);
    if n < 2 {
        return n;
    }
    let mut r = (n as f64).sqrt() as i128;
    while r > 0 && r.checked_mul(r).map_or(true, |sq| sq > n) {
        r -= 1;
    }
    while (r + 1).checked_mul(r + 1).is_some_and(|sq| sq <= n) {
        r += 1;
    }
    r
}

/// Integer cube root: the largest `r` with `r^3 <= n`.
pub fn iroot3(n: i128) -> i128 {
    assert!(n >= 0, "iroot3 of negative number {}", n);
    if n < 2 {
        return n;
    }
    let cube = |r: i128| r.checked_mul(r).and_then(|sq| sq.checked_mul(r));
    let mut r = (n as f64).cbrt() as i128;
    while r > 0 && cube(r).map_or(true, |c| c > n) {
        r -= 1;
    }
    while cube(r + 1).is_some_and(|c| c <= n) {
        r += 1;
    }
    r
}

#[inline]
pub fn ceil_div(a: i64, b: i64) -> i64 {
    debug_assert!(a >= 0 && b > 0);
    (a + b - 1) / b
}

/// Smallest power of two `>= n` (1 for `n <= 1`).
pub fn next_power_of_two(n: i64) -> i64 {
    if n <= 1 {
        1
    } else {
        (n as u64).next_power_of_two() as i64
    }
}

/// Clamp `x` into `[min, max]`; `min` wins when the bounds cross.
#[inline]
pub fn in_between<T: Ord>(min: T, x: T, max: T) -> T {
    if x < min {
        min
    } else if x > max {
        if max < min {
            min
        } else {
            max
        }
    } else {
        x
    }
}

/// Below this many sieved integers per thread, extra threads cost more than they save.
pub const THREAD_THRESHOLD: i64 = 100_000;

/// Number of threads worth using for a sieve of `sieve_limit` integers.
pub fn ideal_num_threads(threads: usize, sieve_limit: i64, thread_threshold: i64) -> usize {
    let useful = (sieve_limit / thread_threshold.max(1)).max(1) as usize;
    in_between(1, threads, useful)
}

/// Percentage of `[0, limit]` covered by `low`, clamped to `[0, 100]`.
pub fn get_percent(low: i64, limit: i64) -> f64 {
    let percent = 100.0 * low as f64 / limit.max(1) as f64;
    percent.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isqrt_exact_squares_and_neighbours() {
        for r in [0i128, 1, 2, 3, 10, 31_622, 1_000_000, 3_037_000_499] {
            assert_eq!(isqrt(r * r), r);
            if r > 0 {
                assert_eq!(isqrt(r * r - 1), r - 1);
            }
            assert_eq!(isqrt(r * r + 2 * r), r);
        }
    }

    #[test]
    fn isqrt_large_128_bit() {
        let r: i128 = 10_000_000_000_000_000_000; // 1e19
        assert_eq!(isqrt(r * r), r);
        assert_eq!(isqrt(r * r - 1), r - 1);
    }

    #[test]
    fn iroot3_known_values() {
        assert_eq!(iroot3(0), 0);
        assert_eq!(iroot3(7), 1);
        assert_eq!(iroot3(8), 2);
        assert_eq!(iroot3(26), 2);
        assert_eq!(iroot3(27), 3);
        assert_eq!(iroot3(1_000_000_000), 1000);
        assert_eq!(iroot3(999_999_999), 999);
        assert_eq!(iroot3(1_000_000_000_000_000_000_000), 10_000_000);
    }

    #[test]
    fn ceil_div_rounds_up() {
        assert_eq!(ceil_div(10, 5), 2);
        assert_eq!(ceil_div(11, 5), 3);
        assert_eq!(ceil_div(0, 5), 0);
    }

    #[test]
    fn next_power_of_two_values() {
        assert_eq!(next_power_of_two(0), 1);
        assert_eq!(next_power_of_two(1), 1);
        assert_eq!(next_power_of_two(3), 4);
        assert_eq!(next_power_of_two(1024), 1024);
        assert_eq!(next_power_of_two(1025), 2048);
    }

    #[test]
    fn in_between_clamps() {
        assert_eq!(in_between(1, 0, 8), 1);
        assert_eq!(in_between(1, 9, 8), 8);
        assert_eq!(in_between(1, 5, 8), 5);
        assert_eq!(in_between(1, 5, 0), 1);
    }

    #[test]
    fn ideal_threads_for_small_sieve_is_one() {
        assert_eq!(ideal_num_threads(8, 1_000, THREAD_THRESHOLD), 1);
        assert_eq!(ideal_num_threads(8, 450_000, THREAD_THRESHOLD), 4);
        assert_eq!(ideal_num_threads(8, 10_000_000, THREAD_THRESHOLD), 8);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(get_percent(50, 100), 50.0);
        assert_eq!(get_percent(150, 100), 100.0);
        assert_eq!(get_percent(0, 0), 0.0);
    }
}
