//! Denormalized export: every detection row with its track's review state
//! and its day's notes.

use std::collections::BTreeMap;
use std::io::Write;

use crate::prelude::ReviewResult;
use crate::records::Detection;
use crate::tracks::{Track, TrackTable};

/// Track attributes appended to every row, in output order.
pub const TRACK_COLUMNS: [&str; 8] = [
    "length",
    "tot_score",
    "avg_score",
    "viewed",
    "user_labeled",
    "label",
    "original_label",
    "notes",
];

/// Day attributes appended after the track attributes.
pub const DAY_COLUMNS: [&str; 1] = ["day_notes"];

/// Back-reference column never written out.
const INTERNAL_COLUMNS: [&str; 1] = ["track"];

/// Flat table ready for serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    /// Writes the table as comma-separated values with minimal quoting.
    pub fn write_csv<W: Write>(&self, writer: W) -> ReviewResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> ReviewResult<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Value of `column` in row `row`.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|name| name == column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }
}

/// Name of the export file for a batch.
pub fn export_filename(batch: &str) -> String {
    format!("roost_labels_{}.csv", batch)
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

fn track_value(track: &Track, column: &str) -> String {
    match column {
        "length" => track.length.to_string(),
        "tot_score" => format_number(track.tot_score),
        "avg_score" => format_number(track.avg_score),
        "viewed" => track.viewed.to_string(),
        "user_labeled" => track.user_labeled.to_string(),
        "label" => track.label.map(|l| l.as_str().to_string()).unwrap_or_default(),
        "original_label" => track
            .original_label
            .map(|l| l.as_str().to_string())
            .unwrap_or_default(),
        "notes" => track.notes.clone(),
        _ => String::new(),
    }
}

pub struct ExportTransform;

impl ExportTransform {
    /// Detection columns of the first row minus derived and internal
    /// columns, then the track columns, then the day columns.
    pub fn columns(detections: &[Detection]) -> Vec<String> {
        let excluded = |name: &str| {
            TRACK_COLUMNS.contains(&name)
                || DAY_COLUMNS.contains(&name)
                || INTERNAL_COLUMNS.contains(&name)
        };
        let detection_columns = detections
            .first()
            .map(|first| {
                first
                    .fields()
                    .names()
                    .filter(|name| !excluded(name))
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        detection_columns
            .into_iter()
            .chain(TRACK_COLUMNS.iter().map(|name| name.to_string()))
            .chain(DAY_COLUMNS.iter().map(|name| name.to_string()))
            .collect()
    }

    pub fn export(
        detections: &[Detection],
        tracks: &TrackTable,
        day_notes: &BTreeMap<String, String>,
    ) -> ExportTable {
        let columns = Self::columns(detections);
        let detection_width = columns.len() - TRACK_COLUMNS.len() - DAY_COLUMNS.len();
        let rows = detections
            .iter()
            .map(|detection| {
                let track = tracks.get(&detection.track_id);
                let mut row = Vec::with_capacity(columns.len());
                for column in &columns[..detection_width] {
                    row.push(detection.field(column).unwrap_or_default().to_string());
                }
                for column in TRACK_COLUMNS {
                    row.push(
                        track
                            .map(|track| track_value(track, column))
                            .unwrap_or_default(),
                    );
                }
                row.push(
                    day_notes
                        .get(&detection.local_date)
                        .cloned()
                        .unwrap_or_default(),
                );
                row
            })
            .collect();
        ExportTable { columns, rows }
    }
}
