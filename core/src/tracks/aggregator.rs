use std::collections::BTreeMap;

use log::debug;

use crate::math::StatsHelper;
use crate::prelude::TrackId;
use crate::records::Detection;
use crate::tracks::{FilterPolicy, Label, Track};

/// Tracks of one batch keyed by id.
pub type TrackTable = BTreeMap<TrackId, Track>;

/// Groups detections into tracks and derives their automatic labels.
pub struct TrackAggregator;

impl TrackAggregator {
    /// Groups `detections` by track id and computes per-track score statistics.
    ///
    /// Review state is taken from the first detection of each group when it
    /// carries one, so re-ingesting an export resumes where it left off.
    pub fn build(detections: &[Detection]) -> TrackTable {
        let mut tracks = TrackTable::new();
        for (index, detection) in detections.iter().enumerate() {
            tracks
                .entry(detection.track_id.clone())
                .or_insert_with(|| Track::seed(detection))
                .detections
                .push(index);
        }

        for track in tracks.values_mut() {
            let summary = StatsHelper::non_negative_summary(
                track.detections.iter().map(|&i| detections[i].det_score),
            );
            track.length = track.detections.len();
            track.tot_score = summary.sum;
            track.avg_score = summary.mean;
        }

        debug!(
            target: "roostcore::tracks",
            "built {} tracks from {} detections",
            tracks.len(),
            detections.len()
        );
        tracks
    }

    /// Recomputes the label of every track the user has not labeled.
    ///
    /// `original_label` follows `label` on every pass while the track is not
    /// user labeled. Returns the number of tracks relabeled.
    pub fn relabel(tracks: &mut TrackTable, detections: &[Detection], policy: &FilterPolicy) -> usize {
        let mut relabeled = 0;
        for track in tracks.values_mut().filter(|track| !track.user_labeled) {
            let label = Self::automatic_label(track, detections, policy);
            track.label = Some(label);
            track.original_label = Some(label);
            relabeled += 1;
        }
        debug!(
            target: "roostcore::tracks",
            "relabeled {} of {} tracks",
            relabeled,
            tracks.len()
        );
        relabeled
    }

    /// Threshold rule. A `NaN` average never passes `avg_score_min`.
    pub fn automatic_label(track: &Track, detections: &[Detection], policy: &FilterPolicy) -> Label {
        let high_quality = StatsHelper::count_at_least(
            track
                .detections
                .iter()
                .filter_map(|&i| detections.get(i))
                .map(|detection| detection.det_score),
            policy.score_min,
        );
        let passes_average = track.avg_score >= policy.avg_score_min;
        if track.length < policy.detections_min
            || high_quality < policy.high_quality_detections_min
            || !passes_average
        {
            Label::NonRoost
        } else {
            Label::SwallowRoost
        }
    }

    /// Records a human label. `original_label` keeps its prior value.
    pub fn set_user_label(track: &mut Track, label: Label) {
        track.label = Some(label);
        track.user_labeled = true;
    }

    pub fn mark_viewed(track: &mut Track) {
        track.viewed = true;
    }
}
