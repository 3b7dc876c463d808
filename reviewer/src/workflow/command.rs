use anyhow::{anyhow, bail, Context};
use std::path::PathBuf;
use std::time::Duration;

use roostcore::navigation::{parse_key, Key, Modifiers};
use roostcore::tracks::Label;
use roostcore::TrackId;

/// One line of reviewer input.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewCommand {
    Key(Key, Modifiers),
    Dataset(String),
    Batch(String),
    /// Zero-based day index.
    Day(usize),
    /// Zero-based frame index.
    Frame(usize),
    Label { track: TrackId, label: Label },
    /// Notes for the selected track.
    Notes(String),
    DayNotes(String),
    Filter { key: String, value: String },
    Hover(TrackId),
    Leave,
    Wait(Duration),
    Export(Option<PathBuf>),
    Status,
    Quit,
}

/// Accepts a label name (`weather-roost`) or its key digit (`3`).
pub fn parse_label(text: &str) -> anyhow::Result<Label> {
    if let Ok(digit) = text.parse::<u8>() {
        return Label::from_digit(digit).ok_or_else(|| anyhow!("no label for key {}", digit));
    }
    Ok(text.parse::<Label>()?)
}

fn index(verb: &str, rest: &str) -> anyhow::Result<usize> {
    rest.parse()
        .with_context(|| format!("`{}` expects an index, got `{}`", verb, rest))
}

fn required<'a>(verb: &str, rest: &'a str) -> anyhow::Result<&'a str> {
    if rest.is_empty() {
        bail!("`{}` expects an argument", verb);
    }
    Ok(rest)
}

impl ReviewCommand {
    /// Parses a line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        if let Some((key, modifiers)) = parse_key(line) {
            return Ok(Some(ReviewCommand::Key(key, modifiers)));
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let command = match verb.to_ascii_lowercase().as_str() {
            "dataset" => ReviewCommand::Dataset(required(verb, rest)?.to_string()),
            "batch" => ReviewCommand::Batch(required(verb, rest)?.to_string()),
            "day" => ReviewCommand::Day(index(verb, rest)?),
            "frame" => ReviewCommand::Frame(index(verb, rest)?),
            "label" => {
                let (track, label) = required(verb, rest)?
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("`label` expects TRACK LABEL"))?;
                ReviewCommand::Label {
                    track: track.to_string(),
                    label: parse_label(label.trim())?,
                }
            }
            "notes" => ReviewCommand::Notes(rest.to_string()),
            "day-notes" => ReviewCommand::DayNotes(rest.to_string()),
            "filter" => {
                let (key, value) = required(verb, rest)?
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow!("`filter` expects KEY VALUE"))?;
                ReviewCommand::Filter {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                }
            }
            "hover" => ReviewCommand::Hover(required(verb, rest)?.to_string()),
            "leave" => ReviewCommand::Leave,
            "wait" => {
                let millis: u64 = rest
                    .parse()
                    .with_context(|| format!("`wait` expects milliseconds, got `{}`", rest))?;
                ReviewCommand::Wait(Duration::from_millis(millis))
            }
            "export" => ReviewCommand::Export((!rest.is_empty()).then(|| PathBuf::from(rest))),
            "status" => ReviewCommand::Status,
            "quit" | "exit" => ReviewCommand::Quit,
            _ => bail!("unknown command `{}`", line),
        };
        Ok(Some(command))
    }
}
