use log::warn;
use serde::{Deserialize, Serialize};

use crate::prelude::{ReviewError, ReviewResult, TrackId};
use crate::records::scan::{parse_local_date, parse_scan};
use crate::records::FieldMap;
use crate::tracks::Label;

/// Track ids shorter than this are only unique within one station-day.
const QUALIFIED_TRACK_ID_LEN: usize = 13;

/// Review state carried by rows of a previous export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorReview {
    pub viewed: bool,
    pub user_labeled: bool,
    pub label: Option<Label>,
    pub original_label: Option<Label>,
    pub notes: String,
}

impl PriorReview {
    /// Present only when the row carries the `viewed` column.
    fn from_fields(row: &FieldMap) -> Option<Self> {
        let viewed = row.get("viewed")?;
        Some(Self {
            viewed: parse_flag(viewed),
            user_labeled: row.get("user_labeled").map(parse_flag).unwrap_or(false),
            label: row.get("label").and_then(parse_label),
            original_label: row.get("original_label").and_then(parse_label),
            notes: row.get("notes").unwrap_or_default().to_string(),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

fn parse_label(value: &str) -> Option<Label> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(label) => Some(label),
        Err(err) => {
            warn!(target: "roostcore::records", "ignoring prior label: {}", err);
            None
        }
    }
}

fn parse_number(row: &FieldMap, name: &str) -> Option<f64> {
    row.get(name)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| !value.is_nan())
}

/// One detection (bounding box) of a track in a single scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub track_id: TrackId,
    pub filename: String,
    pub local_date: String,
    /// `None` when the row carried no parseable score.
    pub det_score: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub r: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub prior: Option<PriorReview>,
    pub day_notes: Option<String>,
    fields: FieldMap,
}

impl Detection {
    pub fn new(
        track_id: impl Into<TrackId>,
        filename: impl Into<String>,
        local_date: impl Into<String>,
    ) -> Self {
        let track_id = track_id.into();
        let filename = filename.into();
        let local_date = local_date.into();
        let mut fields = FieldMap::new();
        fields.set("track_id", track_id.as_str());
        fields.set("filename", filename.as_str());
        fields.set("local_date", local_date.as_str());
        Self {
            track_id,
            filename,
            local_date,
            det_score: None,
            x: None,
            y: None,
            r: None,
            lat: None,
            lon: None,
            prior: None,
            day_notes: None,
            fields,
        }
    }

    pub fn with_score(mut self, det_score: f64) -> Self {
        self.fields.set("det_score", det_score.to_string());
        self.det_score = Some(det_score).filter(|score| !score.is_nan());
        self
    }

    pub fn with_prior(mut self, prior: PriorReview) -> Self {
        self.prior = Some(prior);
        self
    }

    /// Parses a raw row into a detection.
    ///
    /// Fills `station`, `date` and `time` from the scan name, exchanges `x`
    /// and `y` when `swap` is set, derives `local_date` from `local_time`,
    /// and qualifies short track ids with station and local date.
    pub fn from_fields(mut row: FieldMap, swap: bool) -> ReviewResult<Self> {
        let filename = row
            .get("filename")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ReviewError::MissingField("filename"))?
            .to_string();
        let raw_track_id = row
            .get("track_id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ReviewError::MissingField("track_id"))?
            .to_string();

        let info = parse_scan(&filename);
        if let Some(info) = &info {
            for (name, value) in info.pairs() {
                row.set(name, value);
            }
        }

        if swap {
            row.swap_values("x", "y");
        }

        let local_date = match row.get("local_time").and_then(parse_local_date) {
            Some(date) => date,
            None => row
                .get("local_date")
                .map(str::trim)
                .filter(|date| !date.is_empty())
                .ok_or(ReviewError::MissingField("local_time"))?
                .to_string(),
        };
        row.set("local_date", local_date.as_str());

        let track_id = match &info {
            Some(info) if raw_track_id.len() < QUALIFIED_TRACK_ID_LEN => {
                format!("{}{}-{}", info.station, local_date, raw_track_id)
            }
            _ => raw_track_id,
        };
        row.set("track_id", track_id.as_str());

        Ok(Self {
            det_score: parse_number(&row, "det_score"),
            x: parse_number(&row, "x"),
            y: parse_number(&row, "y"),
            r: parse_number(&row, "r"),
            lat: parse_number(&row, "lat"),
            lon: parse_number(&row, "lon"),
            prior: PriorReview::from_fields(&row),
            day_notes: row.get("day_notes").map(str::to_string),
            track_id,
            filename,
            local_date,
            fields: row,
        })
    }

    /// Raw column value after ingestion adjustments.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Score usable in sums and averages.
    pub fn non_negative_score(&self) -> Option<f64> {
        self.det_score.filter(|score| *score >= 0.0)
    }

    pub fn frame_key(&self) -> &str {
        self.filename.trim()
    }
}
