use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::navigation::{IndexedSequence, Selection};
use crate::prelude::TrackId;
use crate::records::Scan;

/// Resumable "where am I" position, e.g. restored from a saved link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavPosition {
    pub dataset: String,
    pub batch: String,
    pub day: usize,
    pub frame: usize,
}

/// Coarse navigation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    NoDataset,
    DatasetSelected,
    BatchSelected,
    DaySelected,
}

/// Movement along a day or frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Prev,
    Next,
    PrevFlagged,
    NextFlagged,
}

impl Step {
    pub fn apply<T>(self, sequence: &mut IndexedSequence<T>) -> bool {
        match self {
            Step::Prev => sequence.prev(),
            Step::Next => sequence.next(),
            Step::PrevFlagged => sequence.prev_flagged(),
            Step::NextFlagged => sequence.next_flagged(),
        }
    }
}

/// Days of the batch, frames of the current day, per-day notes and the
/// selected track.
#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    dataset: Option<String>,
    batch: Option<String>,
    days: IndexedSequence<String>,
    frames: IndexedSequence<Scan>,
    day_notes: BTreeMap<String, String>,
    selection: Selection,
}

impl NavigationState {
    pub fn with_selection(selection: Selection) -> Self {
        Self {
            selection,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        match (&self.dataset, &self.batch) {
            (None, _) => Phase::NoDataset,
            (Some(_), None) => Phase::DatasetSelected,
            (Some(_), Some(_)) if self.days.is_empty() => Phase::BatchSelected,
            (Some(_), Some(_)) => Phase::DaySelected,
        }
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn batch(&self) -> Option<&str> {
        self.batch.as_deref()
    }

    pub fn days(&self) -> &IndexedSequence<String> {
        &self.days
    }

    pub fn frames(&self) -> &IndexedSequence<Scan> {
        &self.frames
    }

    pub fn current_day(&self) -> Option<&str> {
        self.days.current().map(String::as_str)
    }

    pub fn current_frame(&self) -> Option<&Scan> {
        self.frames.current()
    }

    pub fn position(&self) -> NavPosition {
        NavPosition {
            dataset: self.dataset.clone().unwrap_or_default(),
            batch: self.batch.clone().unwrap_or_default(),
            day: self.days.current_index(),
            frame: self.frames.current_index(),
        }
    }

    /// Enters a dataset; batch, days, frames, notes and selection are cleared.
    pub fn enter_dataset(&mut self, dataset: &str) {
        self.dataset = Some(dataset.to_string());
        self.clear_batch();
    }

    /// Enters a batch with its day sequence and initial day notes.
    pub fn enter_batch(
        &mut self,
        batch: &str,
        days: IndexedSequence<String>,
        day_notes: BTreeMap<String, String>,
    ) {
        self.clear_batch();
        self.batch = Some(batch.to_string());
        self.days = days;
        self.day_notes = day_notes;
    }

    fn clear_batch(&mut self) {
        self.batch = None;
        self.days = IndexedSequence::default();
        self.frames = IndexedSequence::default();
        self.day_notes.clear();
        self.selection.unselect();
    }

    pub fn set_day_index(&mut self, index: usize) -> bool {
        self.days.set_current(index)
    }

    pub fn step_day(&mut self, step: Step) -> bool {
        step.apply(&mut self.days)
    }

    /// Replaces the frame sequence after a day change; the cursor starts at 0.
    pub fn set_frames(&mut self, frames: IndexedSequence<Scan>) {
        self.frames = frames;
    }

    pub fn set_frame_index(&mut self, index: usize) -> bool {
        self.frames.set_current(index)
    }

    pub fn step_frame(&mut self, step: Step) -> bool {
        step.apply(&mut self.frames)
    }

    pub fn day_notes(&self) -> &BTreeMap<String, String> {
        &self.day_notes
    }

    pub fn current_day_notes(&self) -> &str {
        self.current_day()
            .and_then(|day| self.day_notes.get(day))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Stores notes for the current day. Returns false without a current day.
    pub fn set_current_day_notes(&mut self, notes: &str) -> bool {
        match self.days.current() {
            Some(day) => {
                self.day_notes.insert(day.clone(), notes.to_string());
                true
            }
            None => false,
        }
    }

    pub fn selected_track(&self) -> Option<&TrackId> {
        self.selection.selected()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }
}
