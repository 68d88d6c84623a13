//! # Config — TOML Settings File
//!
//! Optional defaults for the command line, read from the file given with
//! `--config`. Command-line flags and environment variables win over the
//! file; the file wins over built-in defaults.
//!
//! ```toml
//! threads = 8
//! alpha = 2.5
//! status_interval_secs = 10
//!
//! [cluster]
//! workers = 4
//! threads_per_worker = 2
//! transport = "process"
//! worker_timeout_secs = 7200
//! checkpoint = "s2.checkpoint"
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cluster::Transport;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub threads: Option<usize>,
    pub alpha: Option<f64>,
    pub status_interval_secs: Option<u64>,
    pub cluster: ClusterSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterSettings {
    pub workers: Option<usize>,
    pub threads_per_worker: Option<usize>,
    pub transport: Option<Transport>,
    pub worker_timeout_secs: Option<u64>,
    pub checkpoint: Option<PathBuf>,
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if let Some(alpha) = self.alpha {
            if !(alpha >= 1.0 && alpha.is_finite()) {
                bail!("alpha must be a finite number >= 1, got {}", alpha);
            }
        }
        if self.cluster.workers == Some(0) {
            bail!("cluster.workers must be at least 1");
        }
        if self.cluster.worker_timeout_secs == Some(0) {
            bail!("cluster.worker_timeout_secs must be positive");
        }
        Ok(())
    }
}

pub fn parse(content: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(content)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse(&content).with_context(|| format!("invalid config file {}", path.display()))
}
