//! Per-dataset configuration and `{key}` path pattern expansion.

use serde::{Deserialize, Serialize};

use crate::prelude::{ReviewError, ReviewResult};
use crate::records::Scan;
use crate::tracks::{FilterPolicy, PolicyOverrides};

/// Replaces `{key}` placeholders with values from `pairs`. Unknown
/// placeholders are kept verbatim.
pub fn expand_pattern(pattern: &str, pairs: &[(&str, &str)]) -> String {
    let mut expanded = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        expanded.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match pairs.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => expanded.push_str(value),
                    None => {
                        expanded.push('{');
                        expanded.push_str(key);
                        expanded.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                expanded.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    expanded.push_str(rest);
    expanded
}

/// Where the scan list of a batch lives, optionally with a filter pattern
/// that selects the scans belonging to the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanSource {
    Pattern(String),
    Filtered {
        pattern: String,
        #[serde(default)]
        filter: Option<String>,
    },
}

impl Default for ScanSource {
    fn default() -> Self {
        ScanSource::Pattern(String::new())
    }
}

impl ScanSource {
    pub fn pattern(&self) -> &str {
        match self {
            ScanSource::Pattern(pattern) => pattern,
            ScanSource::Filtered { pattern, .. } => pattern,
        }
    }

    pub fn filter(&self) -> Option<&str> {
        match self {
            ScanSource::Pattern(_) => None,
            ScanSource::Filtered { filter, .. } => filter.as_deref(),
        }
    }
}

/// Dataset configuration (`config.json` next to a dataset's batch list).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Pattern of the detections file of a batch.
    pub boxes: String,
    pub scans: ScanSource,
    #[serde(default)]
    pub filtering: Option<PolicyOverrides>,
    /// Exchange `x` and `y` of every detection row.
    #[serde(default)]
    pub swap: bool,
    /// Image URL patterns, one per display surface.
    #[serde(default)]
    pub urls: Vec<String>,
}

impl DatasetConfig {
    pub fn from_json(text: &str) -> ReviewResult<Self> {
        let config: DatasetConfig = serde_json::from_str(text)
            .map_err(|err| ReviewError::InvalidConfig(err.to_string()))?;
        config.policy()?;
        Ok(config)
    }

    /// Default policy with this dataset's overrides.
    pub fn policy(&self) -> ReviewResult<FilterPolicy> {
        match &self.filtering {
            Some(overrides) => FilterPolicy::with_overrides(overrides),
            None => Ok(FilterPolicy::default()),
        }
    }

    pub fn boxes_path(&self, dataset: &str, batch: &str) -> String {
        expand_pattern(&self.boxes, &[("dataset", dataset), ("batch", batch)])
    }

    pub fn scans_path(&self, dataset: &str, batch: &str) -> String {
        expand_pattern(
            self.scans.pattern(),
            &[("dataset", dataset), ("batch", batch)],
        )
    }

    /// Whether `scan` belongs to `batch` under the scan filter. Scans are
    /// kept when no filter is configured.
    pub fn scan_in_batch(&self, scan: &Scan, batch: &str) -> bool {
        let Some(filter) = self.scans.filter() else {
            return true;
        };
        let pairs: Vec<(&str, &str)> = scan
            .info
            .as_ref()
            .map(|info| info.pairs().to_vec())
            .unwrap_or_default();
        expand_pattern(filter, &pairs) == batch
    }

    /// Image URLs for a frame, one per surface.
    pub fn frame_urls(&self, dataset: &str, batch: &str, scan: &Scan) -> Vec<String> {
        let mut pairs = vec![
            ("dataset", dataset),
            ("batch", batch),
            ("filename", scan.key()),
            ("local_date", scan.local_date.as_str()),
        ];
        if let Some(info) = &scan.info {
            pairs.extend(info.pairs());
        }
        self.urls
            .iter()
            .map(|pattern| expand_pattern(pattern, &pairs))
            .collect()
    }
}
