use serde::{Deserialize, Serialize};

/// Session counters exposed alongside the navigation snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewMetrics {
    pub rows_ingested: usize,
    pub rows_skipped: usize,
    pub labels_assigned: usize,
    pub exports_written: usize,
}

impl ReviewMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ingested(&mut self, count: usize) {
        self.rows_ingested += count;
    }

    pub fn record_skipped(&mut self) {
        self.rows_skipped += 1;
    }

    pub fn record_label(&mut self) {
        self.labels_assigned += 1;
    }

    pub fn record_export(&mut self) {
        self.exports_written += 1;
    }

    pub fn snapshot(&self) -> ReviewMetrics {
        *self
    }
}
