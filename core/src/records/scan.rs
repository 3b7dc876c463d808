use serde::{Deserialize, Serialize};

use crate::prelude::{ReviewError, ReviewResult};
use crate::records::FieldMap;

/// Station, UTC date and UTC time encoded in a scan name such as
/// `KDOX20191001_103012_V06`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanInfo {
    pub station: String,
    pub date: String,
    pub time: String,
}

impl ScanInfo {
    /// Key/value pairs usable for pattern expansion.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("station", self.station.as_str()),
            ("date", self.date.as_str()),
            ("time", self.time.as_str()),
        ]
    }
}

/// Splits a scan filename into station, date and time.
pub fn parse_scan(filename: &str) -> Option<ScanInfo> {
    let name = filename.trim();
    let name = name.rsplit('/').next().unwrap_or(name);
    if name.len() < 19 || !name.is_char_boundary(4) || !name.is_char_boundary(19) {
        return None;
    }
    let bytes = name.as_bytes();
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    if !digits(4..12) || bytes[12] != b'_' || !digits(13..19) {
        return None;
    }
    Some(ScanInfo {
        station: name[..4].to_string(),
        date: name[4..12].to_string(),
        time: name[13..19].to_string(),
    })
}

/// Extracts the `YYYYMMDD` date from a local timestamp, accepting both
/// `20191001103012` and `2019-10-01 10:30:12` forms.
pub fn parse_local_date(local_time: &str) -> Option<String> {
    let digits: String = local_time
        .chars()
        .filter(char::is_ascii_digit)
        .take(8)
        .collect();
    (digits.len() == 8).then_some(digits)
}

/// `20191001` -> `2019-10-01`.
pub fn format_day(day: &str) -> String {
    if day.len() == 8 && day.is_char_boundary(4) && day.is_char_boundary(6) {
        format!("{}-{}-{}", &day[..4], &day[4..6], &day[6..])
    } else {
        day.to_string()
    }
}

/// `103012` -> `10:30:12`.
pub fn format_time(time: &str) -> String {
    if time.len() == 6 && time.is_char_boundary(2) && time.is_char_boundary(4) {
        format!("{}:{}:{}", &time[..2], &time[2..4], &time[4..])
    } else {
        time.to_string()
    }
}

/// One radar scan (frame) of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub filename: String,
    pub local_time: String,
    pub local_date: String,
    pub info: Option<ScanInfo>,
}

impl Scan {
    pub fn new(filename: impl Into<String>, local_date: impl Into<String>) -> Self {
        let filename = filename.into();
        let local_date = local_date.into();
        Self {
            info: parse_scan(&filename),
            local_time: local_date.clone(),
            filename,
            local_date,
        }
    }

    pub fn from_fields(row: &FieldMap) -> ReviewResult<Self> {
        let filename = row
            .get("filename")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(ReviewError::MissingField("filename"))?;
        let local_time = row
            .get("local_time")
            .ok_or(ReviewError::MissingField("local_time"))?;
        let local_date = parse_local_date(local_time).ok_or_else(|| {
            ReviewError::InvalidRow(format!("unparseable local_time `{}`", local_time))
        })?;
        Ok(Self {
            filename: filename.to_string(),
            local_time: local_time.to_string(),
            local_date,
            info: parse_scan(filename),
        })
    }

    /// Frame key matched against detection filenames.
    pub fn key(&self) -> &str {
        self.filename.trim()
    }

    /// Human readable UTC time of the scan, falling back to the filename.
    pub fn label(&self) -> String {
        match &self.info {
            Some(info) => format_time(&info.time),
            None => self.filename.clone(),
        }
    }
}
