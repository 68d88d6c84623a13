//! # Pi — Prime Counting Entry Points
//!
//! Combines the pieces into `π(x)` with the Lagarias–Miller–Odlyzko
//! identity
//!
//! ```text
//! π(x) = S1 + S2 + π(y) − 1 − P2,      y = ⌊x^{1/3} · α⌋
//! ```
//!
//! where `S1 + S2 = φ(x, π(y))`. `α` trades the O(x/y) sieve of S2 against
//! the O(y) tables; the default follows Oliveira e Silva,
//! `α = max(1, 1.5 · ln ln ln x)`.
//!
//! Also provides Legendre's formula as an independent cross-check and the
//! parser for `x` given as an expression (`10^12`, `2*10^9`, `1e15`).

use anyhow::{anyhow, bail, Result};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::cluster::{s2_cluster, ClusterOptions};
use crate::p2::p2;
use crate::partition::s2;
use crate::phi::{phi, tiny_phi_cutoff};
use crate::pmath::{in_between, iroot3, isqrt};
use crate::progress::Progress;
use crate::s1::s1;
use crate::sieve::{generate_primes, Tables};

/// Below this bound π(x) is counted with a plain sieve.
pub const SMALL_X: i128 = 1_000;

/// LMO parameters for one `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmoParams {
    pub x: i128,
    pub y: i64,
    pub c: usize,
    pub alpha: f64,
}

impl LmoParams {
    pub fn new(x: i128, alpha: Option<f64>) -> Self {
        assert!(x >= SMALL_X, "LMO parameters need x >= {}", SMALL_X);
        let alpha = alpha.unwrap_or_else(|| get_alpha_lmo(x)).max(1.0);
        let x13 = iroot3(x) as i64;
        let y = (x13 as f64 * alpha) as i64;
        let y = in_between(x13, y, isqrt(x) as i64);
        LmoParams {
            x,
            y,
            c: tiny_phi_cutoff(y),
            alpha,
        }
    }
}

pub fn get_alpha_lmo(x: i128) -> f64 {
    let lll = (x as f64).ln().ln().ln();
    (1.5 * lll).max(1.0)
}

/// π(x) by the LMO method.
pub fn pi_lmo(x: i128, threads: usize, alpha: Option<f64>, progress: Option<&Progress>) -> i128 {
    if x < SMALL_X {
        return pi_sieve(x.max(0) as u64) as i128;
    }

    let params = LmoParams::new(x, alpha);
    info!(x = %x, y = params.y, c = params.c, alpha = params.alpha, threads, "pi_lmo");
    let tables = Tables::new(params.y);
    let result = combine(&params, &tables, progress, || {
        Ok::<_, Infallible>(s2(x, params.y, params.c, &tables, threads, progress))
    });
    match result {
        Ok(pi) => pi,
        Err(never) => match never {},
    }
}

/// π(x) by the LMO method with S2 computed on a worker cluster.
pub fn pi_lmo_cluster(
    x: i128,
    alpha: Option<f64>,
    opts: &ClusterOptions,
    progress: Option<&Progress>,
) -> Result<i128> {
    if x < SMALL_X {
        return Ok(pi_sieve(x.max(0) as u64) as i128);
    }

    let params = LmoParams::new(x, alpha);
    info!(x = %x, y = params.y, c = params.c, alpha = params.alpha, workers = opts.workers, "pi_lmo_cluster");
    let tables = Arc::new(Tables::new(params.y));
    combine(&params, &tables, progress, || s2_cluster(x, params.y, params.c, &tables, opts))
}

/// `S1 + S2 + π(y) − 1 − P2`, with S2 supplied by the caller.
fn combine<E>(
    params: &LmoParams,
    tables: &Tables,
    progress: Option<&Progress>,
    s2: impl FnOnce() -> Result<i128, E>,
) -> Result<i128, E> {
    let LmoParams { x, y, c, .. } = *params;
    let time = Instant::now();
    let pi_y = tables.pi_y() as i128;
    let stage = |name: &str| {
        if let Some(p) = progress {
            p.set_stage(name);
        }
    };

    stage("S1");
    let s1 = s1(x, y, c, tables);
    info!(s1 = %s1, "S1 done");

    stage("S2");
    let s2 = s2()?;
    info!(s2 = %s2, "S2 done");

    stage("P2");
    let p2 = p2(x, y);
    info!(p2 = %p2, seconds = time.elapsed().as_secs_f64(), "P2 done");

    Ok(s1 + s2 + pi_y - 1 - p2)
}

/// π(x) by Legendre's formula `φ(x, a) + a − 1`, `a = π(√x)`.
pub fn pi_legendre(x: i128) -> i128 {
    if x < 2 {
        return 0;
    }
    let mut primes: Vec<u32> = vec![0];
    primes.extend(generate_primes(isqrt(x) as u64).into_iter().map(|p| p as u32));
    let a = primes.len() - 1;
    phi(x, a, &primes) + a as i128 - 1
}

/// π(x) by sieving every integer up to `x`.
pub fn pi_sieve(x: u64) -> u64 {
    generate_primes(x).len() as u64
}

/// Parse `x` written as an integer or a product of `a^b`, `aeb` and plain
/// integer factors, e.g. `1000003`, `10^12`, `2*10^9`, `1e15`, `1_000_000`.
pub fn parse_x(expr: &str) -> Result<i128> {
    let cleaned: String = expr.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
    if cleaned.is_empty() {
        bail!("empty expression");
    }
    let mut value: i128 = 1;
    for factor in cleaned.split('*') {
        let term = parse_factor(factor).map_err(|e| anyhow!("invalid expression {:?}: {}", expr, e))?;
        value = value
            .checked_mul(term)
            .ok_or_else(|| anyhow!("expression {:?} overflows 128 bits", expr))?;
    }
    Ok(value)
}

fn parse_factor(factor: &str) -> Result<i128> {
    let parse_int = |s: &str| -> Result<i128> {
        s.parse::<i128>().map_err(|e| anyhow!("{:?}: {}", s, e))
    };
    let (base, exp) = if let Some((b, e)) = factor.split_once('^') {
        (parse_int(b)?, parse_int(e)?)
    } else if let Some((m, e)) = factor.split_once(|c: char| c == 'e' || c == 'E') {
        let exp = parse_int(e)?;
        let mantissa = parse_int(m)?;
        let pow = checked_pow(10, exp)?;
        return mantissa.checked_mul(pow).ok_or_else(|| anyhow!("overflow"));
    } else {
        return parse_int(factor);
    };
    checked_pow(base, exp)
}

fn checked_pow(base: i128, exp: i128) -> Result<i128> {
    let exp = u32::try_from(exp).map_err(|_| anyhow!("exponent {} out of range", exp))?;
    base.checked_pow(exp).ok_or_else(|| anyhow!("{}^{} overflows", base, exp))
}
