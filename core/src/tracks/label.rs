use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::prelude::ReviewError;

/// Classification assigned to a track, in keyboard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "non-roost")]
    NonRoost,
    #[serde(rename = "swallow-roost")]
    SwallowRoost,
    #[serde(rename = "weather-roost")]
    WeatherRoost,
    #[serde(rename = "unknown-noise-roost")]
    UnknownNoiseRoost,
    #[serde(rename = "AP-roost")]
    ApRoost,
    #[serde(rename = "duplicate")]
    Duplicate,
    #[serde(rename = "bad-track")]
    BadTrack,
}

impl Label {
    pub const ALL: [Label; 7] = [
        Label::NonRoost,
        Label::SwallowRoost,
        Label::WeatherRoost,
        Label::UnknownNoiseRoost,
        Label::ApRoost,
        Label::Duplicate,
        Label::BadTrack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Label::NonRoost => "non-roost",
            Label::SwallowRoost => "swallow-roost",
            Label::WeatherRoost => "weather-roost",
            Label::UnknownNoiseRoost => "unknown-noise-roost",
            Label::ApRoost => "AP-roost",
            Label::Duplicate => "duplicate",
            Label::BadTrack => "bad-track",
        }
    }

    /// Label bound to digit key `digit` (1-based).
    pub fn from_digit(digit: u8) -> Option<Label> {
        let index = usize::from(digit).checked_sub(1)?;
        Label::ALL.get(index).copied()
    }

    pub fn digit(self) -> u8 {
        Label::ALL
            .iter()
            .position(|label| *label == self)
            .map(|index| index as u8 + 1)
            .unwrap_or(0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = ReviewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .iter()
            .copied()
            .find(|label| label.as_str() == value)
            .ok_or_else(|| ReviewError::InvalidRow(format!("unknown label `{}`", value)))
    }
}
