use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::DatasetConfig;
use crate::navigation::IndexedSequence;
use crate::prelude::{BatchPayload, TrackId};
use crate::records::{Detection, Scan};
use crate::telemetry::{LogManager, ReviewMetrics};
use crate::tracks::{FilterPolicy, TrackAggregator, TrackTable};

/// Detections, tracks and scans of the selected batch.
#[derive(Debug, Clone, Default)]
pub struct BatchData {
    pub detections: Vec<Detection>,
    pub tracks: TrackTable,
    /// Scans grouped by local date, in order of first appearance.
    scans_by_day: Vec<(String, Vec<Scan>)>,
    detections_by_day: HashMap<String, Vec<usize>>,
}

impl BatchData {
    /// Parses the raw rows of a batch. Rows that cannot be parsed are
    /// logged and skipped; the rest of the batch is kept.
    pub fn ingest(
        payload: BatchPayload,
        config: &DatasetConfig,
        batch: &str,
        policy: &FilterPolicy,
        logger: &LogManager,
        metrics: &mut ReviewMetrics,
    ) -> Self {
        let mut scans_by_day: Vec<(String, Vec<Scan>)> = Vec::new();
        let mut day_slots: HashMap<String, usize> = HashMap::new();
        for (line, row) in payload.scan_rows.iter().enumerate() {
            let scan = match Scan::from_fields(row) {
                Ok(scan) => scan,
                Err(err) => {
                    logger.skipped_row("scan", line + 1, &err);
                    continue;
                }
            };
            if !config.scan_in_batch(&scan, batch) {
                continue;
            }
            let slot = *day_slots.entry(scan.local_date.clone()).or_insert_with(|| {
                scans_by_day.push((scan.local_date.clone(), Vec::new()));
                scans_by_day.len() - 1
            });
            scans_by_day[slot].1.push(scan);
        }

        let mut detections = Vec::with_capacity(payload.detection_rows.len());
        for (line, row) in payload.detection_rows.into_iter().enumerate() {
            match Detection::from_fields(row, config.swap) {
                Ok(detection) => detections.push(detection),
                Err(err) => {
                    logger.skipped_row("detection", line + 1, &err);
                    metrics.record_skipped();
                }
            }
        }
        metrics.record_ingested(detections.len());

        Self::from_parts(detections, scans_by_day, policy)
    }

    /// Builds batch data from parsed records and labels its tracks.
    pub fn from_parts(
        detections: Vec<Detection>,
        scans_by_day: Vec<(String, Vec<Scan>)>,
        policy: &FilterPolicy,
    ) -> Self {
        let mut detections_by_day: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, detection) in detections.iter().enumerate() {
            detections_by_day
                .entry(detection.local_date.clone())
                .or_default()
                .push(index);
        }
        let mut tracks = TrackAggregator::build(&detections);
        TrackAggregator::relabel(&mut tracks, &detections, policy);
        Self {
            detections,
            tracks,
            scans_by_day,
            detections_by_day,
        }
    }

    /// Every day with a scan, flagged when it has any detection.
    pub fn day_sequence(&self) -> IndexedSequence<String> {
        let days = self.scans_by_day.iter().map(|(day, _)| day.clone()).collect();
        let flagged: HashSet<String> = self.detections_by_day.keys().cloned().collect();
        IndexedSequence::new(days, &flagged, String::clone)
    }

    /// Empty notes for every day, overlaid with notes carried by detections.
    pub fn initial_day_notes(&self) -> BTreeMap<String, String> {
        let mut notes: BTreeMap<String, String> = self
            .scans_by_day
            .iter()
            .map(|(day, _)| (day.clone(), String::new()))
            .collect();
        for detection in &self.detections {
            if let Some(day_notes) = &detection.day_notes {
                notes.insert(detection.local_date.clone(), day_notes.clone());
            }
        }
        notes
    }

    /// Every scan of `day`, flagged when it has at least one detection.
    pub fn frame_sequence(&self, day: &str) -> IndexedSequence<Scan> {
        let scans = self
            .scans_by_day
            .iter()
            .find(|(key, _)| key == day)
            .map(|(_, scans)| scans.clone())
            .unwrap_or_default();
        let flagged: HashSet<String> = self
            .detections_of_day(day)
            .map(|detection| detection.frame_key().to_string())
            .collect();
        IndexedSequence::new(scans, &flagged, |scan: &Scan| scan.key().to_string())
    }

    pub fn detections_of_day<'a>(&'a self, day: &str) -> impl Iterator<Item = &'a Detection> + 'a {
        self.detections_by_day
            .get(day)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.detections.get(index))
    }

    /// Detections drawn in `frame` of `day`.
    pub fn detections_in_frame<'a>(
        &'a self,
        day: &str,
        frame: &'a Scan,
    ) -> impl Iterator<Item = &'a Detection> + 'a {
        self.detections_of_day(day)
            .filter(move |detection| detection.frame_key() == frame.key())
    }

    /// Track ids of the detections in `frame`, in row order.
    pub fn active_tracks(&self, day: &str, frame: &Scan) -> Vec<TrackId> {
        self.detections_in_frame(day, frame)
            .map(|detection| detection.track_id.clone())
            .collect()
    }

    pub fn scan_count(&self) -> usize {
        self.scans_by_day.iter().map(|(_, scans)| scans.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FieldMap;

    fn row(pairs: &[(&str, &str)]) -> FieldMap {
        pairs.iter().copied().collect()
    }

    fn payload() -> BatchPayload {
        BatchPayload {
            scan_rows: vec![
                row(&[("filename", "KDOX20191001_100000_V06"), ("local_time", "20191001050000")]),
                row(&[("filename", "KDOX20191001_101000_V06"), ("local_time", "20191001051000")]),
                row(&[("filename", "KDOX20191002_100000_V06"), ("local_time", "20191002050000")]),
                row(&[("local_time", "20191002051000")]),
            ],
            detection_rows: vec![
                row(&[
                    ("track_id", "1"),
                    ("filename", "KDOX20191001_101000_V06"),
                    ("local_time", "20191001051000"),
                    ("det_score", "0.8"),
                    ("day_notes", "haze"),
                ]),
                row(&[("filename", "KDOX20191001_101000_V06")]),
            ],
        }
    }

    #[test]
    fn ingest_groups_scans_by_day_and_skips_bad_rows() {
        let mut metrics = ReviewMetrics::new();
        let data = BatchData::ingest(
            payload(),
            &DatasetConfig::default(),
            "KDOX2019",
            &FilterPolicy::default(),
            &LogManager::default(),
            &mut metrics,
        );
        assert_eq!(data.scan_count(), 3);
        assert_eq!(data.detections.len(), 1);
        assert_eq!(metrics.rows_skipped, 1);

        let days = data.day_sequence();
        assert_eq!(days.items(), &["20191001".to_string(), "20191002".to_string()]);
        assert_eq!(days.flags(), &[true, false]);

        let frames = data.frame_sequence("20191001");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames.flags(), &[false, true]);

        let notes = data.initial_day_notes();
        assert_eq!(notes["20191001"], "haze");
        assert_eq!(notes["20191002"], "");
    }

    #[test]
    fn active_tracks_are_restricted_to_the_frame() {
        let data = BatchData::ingest(
            payload(),
            &DatasetConfig::default(),
            "KDOX2019",
            &FilterPolicy::default(),
            &LogManager::default(),
            &mut ReviewMetrics::new(),
        );
        let frames = data.frame_sequence("20191001");
        assert!(data.active_tracks("20191001", &frames.items()[0]).is_empty());
        assert_eq!(
            data.active_tracks("20191001", &frames.items()[1]),
            vec!["KDOX20191001-1".to_string()]
        );
    }
}
