use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use roostcore::navigation::UNSELECT_DELAY;

/// Reviewer settings: where datasets live and where exports go.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub data_dir: PathBuf,
    /// Datasets offered to the reviewer; empty means "whatever is requested".
    pub datasets: Vec<String>,
    pub export_dir: PathBuf,
    pub unselect_delay_ms: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            datasets: Vec::new(),
            export_dir: PathBuf::from("."),
            unselect_delay_ms: UNSELECT_DELAY.as_millis() as u64,
        }
    }
}

impl ReviewConfig {
    /// Loads YAML (or JSON, which YAML accepts) from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading review config {}", path_ref.display()))?;
        let config: ReviewConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing review config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn unselect_delay(&self) -> Duration {
        Duration::from_millis(self.unselect_delay_ms)
    }

    /// Dataset to open when none is requested explicitly.
    pub fn default_dataset(&self) -> Option<&str> {
        self.datasets.first().map(String::as_str)
    }

    pub fn export_path(&self, filename: &str) -> PathBuf {
        self.export_dir.join(filename)
    }
}
