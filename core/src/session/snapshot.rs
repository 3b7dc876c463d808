use serde::{Deserialize, Serialize};

use crate::navigation::{IndexedSequence, NavPosition, Phase};
use crate::prelude::TrackId;
use crate::session::ReviewSession;
use crate::telemetry::ReviewMetrics;
use crate::tracks::{FilterPolicy, Label};

/// Serializable view of an indexed sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceView {
    pub items: Vec<String>,
    pub flags: Vec<bool>,
    pub current: usize,
}

impl SequenceView {
    fn from_sequence<T>(sequence: &IndexedSequence<T>, label: impl Fn(&T) -> String) -> Self {
        Self {
            items: sequence.items().iter().map(label).collect(),
            flags: sequence.flags().to_vec(),
            current: sequence.current_index(),
        }
    }
}

/// One detection box of an active track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxView {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub r: Option<f64>,
    pub det_score: Option<f64>,
}

/// Renderer-facing state of a track active in the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackView {
    pub id: TrackId,
    pub label: Option<Label>,
    pub filtered: bool,
    pub selected: bool,
    pub viewed: bool,
    pub user_labeled: bool,
    pub notes: String,
    pub boxes: Vec<BoxView>,
}

/// Everything a renderer needs to draw the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub position: NavPosition,
    pub days: SequenceView,
    pub frames: SequenceView,
    pub day_notes: String,
    pub frame_urls: Vec<String>,
    pub active_tracks: Vec<TrackView>,
    pub selected_track: Option<TrackId>,
    pub policy: FilterPolicy,
    pub metrics: ReviewMetrics,
    pub dirty: bool,
}

impl SessionSnapshot {
    pub(crate) fn capture(session: &ReviewSession) -> Self {
        let nav = session.navigation();
        let selected = nav.selected_track().cloned();
        let active_detections = session.active_detections();

        let mut active_tracks: Vec<TrackView> = Vec::new();
        for id in session.active_tracks() {
            if active_tracks.iter().any(|view| &view.id == id) {
                continue;
            }
            let Some(track) = session.track(id) else {
                continue;
            };
            let boxes = active_detections
                .iter()
                .filter(|detection| &detection.track_id == id)
                .map(|detection| BoxView {
                    x: detection.x,
                    y: detection.y,
                    r: detection.r,
                    det_score: detection.det_score,
                })
                .collect();
            active_tracks.push(TrackView {
                id: id.clone(),
                label: track.label,
                filtered: track.is_filtered(),
                selected: selected.as_ref() == Some(id),
                viewed: track.viewed,
                user_labeled: track.user_labeled,
                notes: track.notes.clone(),
                boxes,
            });
        }

        Self {
            phase: nav.phase(),
            position: nav.position(),
            days: SequenceView::from_sequence(nav.days(), |day| day.clone()),
            frames: SequenceView::from_sequence(nav.frames(), |scan| scan.label()),
            day_notes: nav.current_day_notes().to_string(),
            frame_urls: session.frame_urls(),
            active_tracks,
            selected_track: selected,
            policy: *session.policy(),
            metrics: session.metrics(),
            dirty: session.is_dirty(),
        }
    }
}
