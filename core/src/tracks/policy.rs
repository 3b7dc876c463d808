use serde::{Deserialize, Serialize};

use crate::prelude::{ReviewError, ReviewResult};

/// Thresholds driving automatic track labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterPolicy {
    pub detections_min: usize,
    pub high_quality_detections_min: usize,
    pub score_min: f64,
    pub avg_score_min: f64,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            detections_min: 2,
            high_quality_detections_min: 2,
            score_min: 0.05,
            avg_score_min: -1.0,
        }
    }
}

/// Partial policy supplied by a dataset. Unrecognized keys are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyOverrides {
    pub detections_min: Option<usize>,
    pub high_quality_detections_min: Option<usize>,
    pub score_min: Option<f64>,
    pub avg_score_min: Option<f64>,
}

impl FilterPolicy {
    pub fn validate(&self) -> ReviewResult<()> {
        if !self.score_min.is_finite() {
            return Err(ReviewError::InvalidPolicy(format!(
                "score_min must be finite, got {}",
                self.score_min
            )));
        }
        if !self.avg_score_min.is_finite() {
            return Err(ReviewError::InvalidPolicy(format!(
                "avg_score_min must be finite, got {}",
                self.avg_score_min
            )));
        }
        Ok(())
    }

    /// Defaults with the dataset's overrides applied on top.
    pub fn with_overrides(overrides: &PolicyOverrides) -> ReviewResult<Self> {
        let mut policy = Self::default();
        policy.apply(overrides);
        policy.validate()?;
        Ok(policy)
    }

    pub fn apply(&mut self, overrides: &PolicyOverrides) {
        if let Some(value) = overrides.detections_min {
            self.detections_min = value;
        }
        if let Some(value) = overrides.high_quality_detections_min {
            self.high_quality_detections_min = value;
        }
        if let Some(value) = overrides.score_min {
            self.score_min = value;
        }
        if let Some(value) = overrides.avg_score_min {
            self.avg_score_min = value;
        }
    }

    /// Sets one threshold by its key name, as typed into a filter field.
    pub fn set_field(&mut self, key: &str, value: &str) -> ReviewResult<()> {
        let invalid =
            || ReviewError::InvalidPolicy(format!("invalid value `{}` for {}", value, key));
        let value = value.trim();
        let mut updated = *self;
        match key {
            "detections_min" => updated.detections_min = value.parse().map_err(|_| invalid())?,
            "high_quality_detections_min" => {
                updated.high_quality_detections_min = value.parse().map_err(|_| invalid())?
            }
            "score_min" => updated.score_min = value.parse().map_err(|_| invalid())?,
            "avg_score_min" => updated.avg_score_min = value.parse().map_err(|_| invalid())?,
            other => {
                return Err(ReviewError::InvalidPolicy(format!(
                    "unknown filter `{}`",
                    other
                )))
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_named_thresholds() {
        let overrides: PolicyOverrides =
            serde_json::from_str(r#"{"score_min": 0.3, "colour": "red"}"#).unwrap();
        let policy = FilterPolicy::with_overrides(&overrides).unwrap();
        assert_eq!(policy.score_min, 0.3);
        assert_eq!(policy.detections_min, 2);
        assert_eq!(policy.avg_score_min, -1.0);
    }

    #[test]
    fn set_field_rejects_bad_input_without_mutating() {
        let mut policy = FilterPolicy::default();
        assert!(policy.set_field("detections_min", "-3").is_err());
        assert!(policy.set_field("score_min", "NaN").is_err());
        assert!(policy.set_field("bogus", "1").is_err());
        assert_eq!(policy, FilterPolicy::default());
        policy.set_field("detections_min", "4").unwrap();
        assert_eq!(policy.detections_min, 4);
    }
}
