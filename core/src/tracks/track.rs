use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::prelude::TrackId;
use crate::records::Detection;
use crate::tracks::Label;

/// Identifier of a display surface (one radar product image).
pub type SurfaceId = String;

/// Aggregate of all detections sharing one track id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub date: String,
    pub length: usize,
    pub tot_score: f64,
    /// `NaN` when no detection carries a non-negative score.
    pub avg_score: f64,
    pub viewed: bool,
    pub user_labeled: bool,
    pub label: Option<Label>,
    pub original_label: Option<Label>,
    pub notes: String,
    /// Indices of the owning detections in the batch's detection list.
    pub detections: Vec<usize>,
    #[serde(skip)]
    surfaces: BTreeSet<SurfaceId>,
}

impl Track {
    /// Seeds a track from the first detection of its group, resuming any
    /// review state that detection carries.
    pub(crate) fn seed(first: &Detection) -> Self {
        let prior = first.prior.clone().unwrap_or_default();
        Self {
            id: first.track_id.clone(),
            date: first
                .field("date")
                .unwrap_or(first.local_date.as_str())
                .to_string(),
            length: 0,
            tot_score: 0.0,
            avg_score: f64::NAN,
            viewed: prior.viewed,
            user_labeled: prior.user_labeled,
            label: prior.label,
            original_label: prior.original_label,
            notes: prior.notes,
            detections: Vec::new(),
            surfaces: BTreeSet::new(),
        }
    }

    /// Drawn de-emphasized unless labeled as a swallow roost.
    pub fn is_filtered(&self) -> bool {
        self.label != Some(Label::SwallowRoost)
    }

    pub fn register_surface(&mut self, surface: impl Into<SurfaceId>) {
        self.surfaces.insert(surface.into());
    }

    pub fn clear_surfaces(&mut self) {
        self.surfaces.clear();
    }

    pub fn is_visible(&self) -> bool {
        !self.surfaces.is_empty()
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &str> {
        self.surfaces.iter().map(String::as_str)
    }
}
