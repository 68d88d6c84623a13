//! # primepi — Combinatorial Prime Counting
//!
//! Computes `π(x)` with the Lagarias–Miller–Odlyzko method. The expensive
//! part, the special-leaf sum S2, runs as a segmented sieve whose partial
//! results can be split across threads and across a cluster of workers and
//! merged back exactly.
//!
//! ## Module Map
//!
//! | Layer      | Modules |
//! |------------|---------|
//! | Arithmetic | [`pmath`], [`sieve`], [`phi`] |
//! | S2 kernel  | [`counter`], [`segment`], [`leaves`], [`partition`] |
//! | Cluster    | [`cluster`] (message, balancer, pool, coordinator, worker) |
//! | LMO        | [`s1`], [`p2`], [`pi`] |
//! | Support    | [`checkpoint`], [`config`], [`progress`] |

pub mod checkpoint;
pub mod cluster;
pub mod config;
pub mod counter;
pub mod leaves;
pub mod p2;
pub mod partition;
pub mod phi;
pub mod pi;
pub mod pmath;
pub mod progress;
pub mod s1;
pub mod segment;
pub mod sieve;
