//! # Checkpoint — Resumable Cluster State
//!
//! Saves the coordinator's merged progress as JSON with SHA-256 integrity
//! verification and generational backups, so a cluster run that failed can
//! be restarted from the last contiguous frontier instead of from scratch.
//!
//! ## Atomic Writes
//!
//! Checkpoint files are written atomically: write to a temp file, then rename.
//! A crash mid-write leaves the previous generation intact.
//!
//! ## Integrity
//!
//! A SHA-256 hash is stored alongside the JSON data. On load the hash is
//! verified; corrupted checkpoints are skipped in favor of the most recent
//! valid generation (up to 3 generations kept).

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::leaves::{i128_string, LeafSums};

/// Number of backup generations to keep.
const GENERATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Checkpoint {
    /// Special-leaf sums folded over `[1, frontier)`.
    S2 {
        #[serde(with = "i128_string")]
        x: i128,
        y: i64,
        frontier: i64,
        sums: LeafSums,
        saved_at: DateTime<Utc>,
    },
}

impl Checkpoint {
    pub fn s2(x: i128, y: i64, frontier: i64, sums: LeafSums) -> Self {
        Checkpoint::S2 {
            x,
            y,
            frontier,
            sums,
            saved_at: Utc::now(),
        }
    }
}

/// Wrapper that includes a SHA-256 checksum for integrity verification.
#[derive(Serialize, Deserialize)]
struct CheckpointEnvelope {
    checksum: String,
    data: serde_json::Value,
}

fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Return the path for generation `gen` (0 = current, 1 = .1, 2 = .2, ...).
fn generation_path(base: &Path, gen: usize) -> PathBuf {
    if gen == 0 {
        base.to_path_buf()
    } else {
        let mut p = base.as_os_str().to_os_string();
        p.push(format!(".{}", gen));
        PathBuf::from(p)
    }
}

/// Save a checkpoint with integrity checksum and rotating generations.
///
/// Rotation: current → .1 → .2 (oldest .2 is discarded).
pub fn save(path: &Path, checkpoint: &Checkpoint) -> Result<()> {
    for gen in (1..GENERATIONS).rev() {
        let src = generation_path(path, gen - 1);
        let dst = generation_path(path, gen);
        if src.exists() {
            let _ = fs::rename(&src, &dst);
        }
    }

    let data = serde_json::to_value(checkpoint)?;
    let data_str = serde_json::to_string_pretty(&data)?;
    let checksum = sha256_hex(&data_str);

    let envelope = CheckpointEnvelope { checksum, data };
    let json = serde_json::to_string_pretty(&envelope)?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;

    Ok(())
}

/// Load the newest valid checkpoint, falling back to older generations on corruption.
pub fn load(path: &Path) -> Option<Checkpoint> {
    for gen in 0..GENERATIONS {
        let p = generation_path(path, gen);
        if let Some(cp) = load_single(&p) {
            if gen > 0 {
                warn!(generation = gen, path = %p.display(), "recovered checkpoint from older generation");
            }
            return Some(cp);
        }
    }
    None
}

fn load_single(path: &Path) -> Option<Checkpoint> {
    let raw = fs::read_to_string(path).ok()?;
    let envelope: CheckpointEnvelope = serde_json::from_str(&raw).ok()?;

    let data_str = serde_json::to_string_pretty(&envelope.data).ok()?;
    let expected = sha256_hex(&data_str);
    if expected != envelope.checksum {
        warn!(
            path = %path.display(),
            expected = &expected[..12],
            got = &envelope.checksum[..12.min(envelope.checksum.len())],
            "checkpoint integrity check failed"
        );
        return None;
    }

    serde_json::from_value(envelope.data).ok()
}

/// Clear all checkpoint files (current + all generations).
pub fn clear(path: &Path) {
    for gen in 0..GENERATIONS {
        let _ = fs::remove_file(generation_path(path, gen));
    }
    let _ = fs::remove_file(path.with_extension("tmp"));
}
