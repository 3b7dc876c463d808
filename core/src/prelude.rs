use crate::config::DatasetConfig;
use crate::records::FieldMap;

/// Identifier shared by every detection of one track.
pub type TrackId = String;

/// Common error type for the review core.
#[derive(thiserror::Error, Debug)]
pub enum ReviewError {
    #[error("invalid dataset config: {0}")]
    InvalidConfig(String),
    #[error("invalid filter policy: {0}")]
    InvalidPolicy(String),
    #[error("row is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid row: {0}")]
    InvalidRow(String),
    #[error("no dataset selected")]
    NoDataset,
    #[error("no batch selected")]
    NoBatch,
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),
    #[error("index {index} out of range for {what} of length {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("data source failure: {0}")]
    Source(String),
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type ReviewResult<T> = Result<T, ReviewError>;

/// Raw tabular rows for one batch, as handed over by the loading layer.
#[derive(Debug, Clone, Default)]
pub struct BatchPayload {
    pub detection_rows: Vec<FieldMap>,
    pub scan_rows: Vec<FieldMap>,
}

/// Loading collaborator: resolves dataset configuration, batch lists and
/// batch payloads. Each call resolves once; the session consumes the result.
pub trait DataSource {
    fn dataset_config(&mut self, dataset: &str) -> ReviewResult<DatasetConfig>;
    fn batches(&mut self, dataset: &str) -> ReviewResult<Vec<String>>;
    fn batch(
        &mut self,
        dataset: &str,
        batch: &str,
        config: &DatasetConfig,
    ) -> ReviewResult<BatchPayload>;
}

/// Confirmation boundary consulted before a transition discards unsaved edits.
pub trait ChangeGuard {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Guard that accepts every transition.
pub struct AcceptAll;

impl ChangeGuard for AcceptAll {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Guard that rejects every transition.
pub struct RejectAll;

impl ChangeGuard for RejectAll {
    fn confirm(&mut self, _prompt: &str) -> bool {
        false
    }
}

impl<F> ChangeGuard for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Result of a guarded transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Cancelled,
}
