//! Review session: navigation over one dataset/batch plus the track state
//! edited by the reviewer.

pub mod batch;
pub mod snapshot;

use std::io::Write;
use std::time::Instant;

pub use batch::BatchData;
pub use snapshot::{SequenceView, SessionSnapshot, TrackView};

use crate::config::DatasetConfig;
use crate::export::{export_filename, ExportTable, ExportTransform};
use crate::navigation::{
    Command, NavPosition, NavigationState, Selection, SelectionChange, Step, UnselectToken,
};
use crate::prelude::{
    ChangeGuard, DataSource, ReviewError, ReviewResult, TrackId, Transition,
};
use crate::records::Detection;
use crate::telemetry::{LogManager, ReviewMetrics};
use crate::tracks::{FilterPolicy, Label, SurfaceId, Track, TrackAggregator, TrackTable};

const DISCARD_DATASET_PROMPT: &str =
    "Change dataset? You made changes but did not export data.";
const DISCARD_BATCH_PROMPT: &str = "Change batches? You made changes but did not export data.";

/// Interactive review state for one user session.
pub struct ReviewSession {
    nav: NavigationState,
    config: Option<DatasetConfig>,
    batches: Vec<String>,
    policy: FilterPolicy,
    data: Option<BatchData>,
    active_tracks: Vec<TrackId>,
    dirty: bool,
    metrics: ReviewMetrics,
    logger: LogManager,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::with_selection(Selection::default())
    }

    /// Session whose deferred unselect uses the given selection settings.
    pub fn with_selection(selection: Selection) -> Self {
        Self {
            nav: NavigationState::with_selection(selection),
            config: None,
            batches: Vec::new(),
            policy: FilterPolicy::default(),
            data: None,
            active_tracks: Vec::new(),
            dirty: false,
            metrics: ReviewMetrics::new(),
            logger: LogManager::new("roostcore::session"),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn position(&self) -> NavPosition {
        self.nav.position()
    }

    pub fn dataset_config(&self) -> Option<&DatasetConfig> {
        self.config.as_ref()
    }

    pub fn batches(&self) -> &[String] {
        &self.batches
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    pub fn metrics(&self) -> ReviewMetrics {
        self.metrics.snapshot()
    }

    /// True when edits were made since the last export.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn batch_data(&self) -> Option<&BatchData> {
        self.data.as_ref()
    }

    pub fn tracks(&self) -> Option<&TrackTable> {
        self.data.as_ref().map(|data| &data.tracks)
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks()?.get(id)
    }

    pub fn detections(&self) -> &[Detection] {
        self.data
            .as_ref()
            .map(|data| data.detections.as_slice())
            .unwrap_or_default()
    }

    /// Track ids of the detections drawn in the current frame, in row order.
    pub fn active_tracks(&self) -> &[TrackId] {
        &self.active_tracks
    }

    /// Detections drawn in the current frame of the current day.
    pub fn active_detections(&self) -> Vec<&Detection> {
        match (&self.data, self.nav.current_day(), self.nav.current_frame()) {
            (Some(data), Some(day), Some(frame)) => data.detections_in_frame(day, frame).collect(),
            _ => Vec::new(),
        }
    }

    pub fn selected_track(&self) -> Option<&TrackId> {
        self.nav.selected_track()
    }

    // ------------------------------------------------------------------
    // Dataset and batch transitions
    // ------------------------------------------------------------------

    fn confirm_discard(&self, guard: &mut dyn ChangeGuard, prompt: &str) -> bool {
        !self.dirty || guard.confirm(prompt)
    }

    /// Switches to `dataset` and loads its first batch.
    pub fn select_dataset(
        &mut self,
        dataset: &str,
        source: &mut dyn DataSource,
        guard: &mut dyn ChangeGuard,
    ) -> ReviewResult<Transition> {
        self.open_dataset(dataset, None, source, guard)
    }

    /// Restores a saved position: dataset, batch, day and frame. Positions
    /// outside the loaded data fall back to the first day or frame.
    pub fn resume(
        &mut self,
        position: &NavPosition,
        source: &mut dyn DataSource,
        guard: &mut dyn ChangeGuard,
    ) -> ReviewResult<Transition> {
        if position.dataset.is_empty() {
            return Err(ReviewError::NoDataset);
        }
        let batch = (!position.batch.is_empty()).then_some(position.batch.as_str());
        if self.open_dataset(&position.dataset, batch, source, guard)? == Transition::Cancelled {
            return Ok(Transition::Cancelled);
        }
        if self.nav.set_day_index(position.day) {
            self.enter_current_day();
        }
        if self.nav.set_frame_index(position.frame) {
            self.refresh_frame();
        }
        Ok(Transition::Applied)
    }

    fn open_dataset(
        &mut self,
        dataset: &str,
        batch: Option<&str>,
        source: &mut dyn DataSource,
        guard: &mut dyn ChangeGuard,
    ) -> ReviewResult<Transition> {
        if !self.confirm_discard(guard, DISCARD_DATASET_PROMPT) {
            self.logger
                .record(&format!("dataset change to {} cancelled", dataset));
            return Ok(Transition::Cancelled);
        }
        let config = source.dataset_config(dataset)?;
        let policy = config.policy()?;
        let batches = source.batches(dataset)?;

        self.nav.enter_dataset(dataset);
        self.config = Some(config);
        self.policy = policy;
        self.batches = batches;
        self.data = None;
        self.active_tracks.clear();
        self.dirty = false;
        self.logger.record(&format!(
            "dataset {} selected ({} batches)",
            dataset,
            self.batches.len()
        ));

        let batch = batch
            .map(str::to_string)
            .or_else(|| self.batches.first().cloned());
        if let Some(batch) = batch {
            self.load_batch(&batch, source)?;
        }
        Ok(Transition::Applied)
    }

    /// Switches to `batch` of the current dataset, starting at its first day.
    pub fn select_batch(
        &mut self,
        batch: &str,
        source: &mut dyn DataSource,
        guard: &mut dyn ChangeGuard,
    ) -> ReviewResult<Transition> {
        if self.nav.dataset().is_none() {
            return Err(ReviewError::NoDataset);
        }
        if !self.confirm_discard(guard, DISCARD_BATCH_PROMPT) {
            self.logger
                .record(&format!("batch change to {} cancelled", batch));
            return Ok(Transition::Cancelled);
        }
        self.load_batch(batch, source)?;
        Ok(Transition::Applied)
    }

    fn load_batch(&mut self, batch: &str, source: &mut dyn DataSource) -> ReviewResult<()> {
        let dataset = self.nav.dataset().ok_or(ReviewError::NoDataset)?.to_string();
        let config = self.config.as_ref().ok_or(ReviewError::NoDataset)?;
        let payload = source.batch(&dataset, batch, config)?;
        let data = BatchData::ingest(
            payload,
            config,
            batch,
            &self.policy,
            &self.logger,
            &mut self.metrics,
        );

        let days = data.day_sequence();
        let notes = data.initial_day_notes();
        self.logger.record(&format!(
            "batch {} loaded: {} detections, {} tracks, {} days ({} with detections)",
            batch,
            data.detections.len(),
            data.tracks.len(),
            days.len(),
            days.flagged_count()
        ));
        self.nav.enter_batch(batch, days, notes);
        self.data = Some(data);
        self.dirty = false;
        self.enter_current_day();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Day and frame navigation
    // ------------------------------------------------------------------

    /// Re-derives the frames of the current day and starts at its first frame.
    fn enter_current_day(&mut self) {
        let frames = match (&self.data, self.nav.current_day()) {
            (Some(data), Some(day)) => data.frame_sequence(day),
            _ => Default::default(),
        };
        self.nav.set_frames(frames);
        self.refresh_frame();
    }

    /// Recomputes the active tracks of the current frame and drops the selection.
    fn refresh_frame(&mut self) {
        self.nav.selection_mut().unselect();
        self.active_tracks = match (&self.data, self.nav.current_day(), self.nav.current_frame()) {
            (Some(data), Some(day), Some(frame)) => data.active_tracks(day, frame),
            _ => Vec::new(),
        };
        if let Some(data) = self.data.as_mut() {
            for track in data.tracks.values_mut() {
                track.clear_surfaces();
            }
        }
        let position = self.nav.position();
        self.logger.trace_move(&format!(
            "day {} frame {}: {} active tracks",
            position.day,
            position.frame,
            self.active_tracks.len()
        ));
    }

    pub fn select_day(&mut self, index: usize) -> ReviewResult<()> {
        if !self.nav.set_day_index(index) {
            return Err(ReviewError::IndexOutOfRange {
                what: "days",
                index,
                len: self.nav.days().len(),
            });
        }
        self.enter_current_day();
        Ok(())
    }

    /// Moves along the day sequence. Returns whether the day changed.
    pub fn step_day(&mut self, step: Step) -> bool {
        let moved = self.nav.step_day(step);
        if moved {
            self.enter_current_day();
        }
        moved
    }

    pub fn select_frame(&mut self, index: usize) -> ReviewResult<()> {
        if !self.nav.set_frame_index(index) {
            return Err(ReviewError::IndexOutOfRange {
                what: "frames",
                index,
                len: self.nav.frames().len(),
            });
        }
        self.refresh_frame();
        Ok(())
    }

    /// Moves along the frame sequence. Returns whether the frame changed.
    pub fn step_frame(&mut self, step: Step) -> bool {
        let moved = self.nav.step_frame(step);
        if moved {
            self.refresh_frame();
        }
        moved
    }

    /// Registers the active tracks as drawn on `surfaces` and marks them viewed.
    pub fn present_frame(&mut self, surfaces: &[SurfaceId]) {
        let Some(data) = self.data.as_mut() else {
            return;
        };
        for id in &self.active_tracks {
            if let Some(track) = data.tracks.get_mut(id) {
                for surface in surfaces {
                    track.register_surface(surface.as_str());
                }
                TrackAggregator::mark_viewed(track);
            }
        }
    }

    // ------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------

    /// Replaces the policy, relabels every track not labeled by the user and
    /// refreshes the current frame.
    pub fn apply_policy(&mut self, policy: FilterPolicy) -> ReviewResult<usize> {
        policy.validate()?;
        self.policy = policy;
        let relabeled = match self.data.as_mut() {
            Some(data) => TrackAggregator::relabel(&mut data.tracks, &data.detections, &policy),
            None => 0,
        };
        self.refresh_frame();
        Ok(relabeled)
    }

    /// Updates one threshold by name, then applies the policy.
    pub fn set_filter(&mut self, key: &str, value: &str) -> ReviewResult<usize> {
        let mut policy = self.policy;
        policy.set_field(key, value)?;
        self.apply_policy(policy)
    }

    // ------------------------------------------------------------------
    // Track selection and labeling
    // ------------------------------------------------------------------

    pub fn select_track(&mut self, id: &str) -> ReviewResult<SelectionChange> {
        if self.track(id).is_none() {
            return Err(ReviewError::UnknownTrack(id.to_string()));
        }
        Ok(self.nav.selection_mut().select(id))
    }

    pub fn unselect_track(&mut self) -> Option<TrackId> {
        self.nav.selection_mut().unselect()
    }

    /// Schedules the selected track to be unselected after the configured delay.
    pub fn schedule_unselect(&mut self, now: Instant) -> Option<UnselectToken> {
        self.nav.selection_mut().schedule_unselect(now)
    }

    pub fn cancel_unselect(&mut self, token: UnselectToken) -> bool {
        self.nav.selection_mut().cancel(token)
    }

    /// Fires a due deferred unselect. Returns the unselected track.
    pub fn poll_unselect(&mut self, now: Instant) -> Option<TrackId> {
        self.nav.selection_mut().poll(now)
    }

    /// Selects the next active track; the first one when nothing is selected.
    /// Moving past the last active track leaves nothing selected.
    pub fn next_track(&mut self) -> Option<TrackId> {
        if self.active_tracks.is_empty() {
            return None;
        }
        let target = match self.nav.selection_mut().unselect() {
            Some(previous) => self
                .active_tracks
                .iter()
                .position(|id| *id == previous)
                .map(|index| index + 1)
                .unwrap_or(0),
            None => 0,
        };
        self.select_active(target)
    }

    /// Selects the previous active track; the last one when nothing is
    /// selected. Moving before the first leaves nothing selected.
    pub fn prev_track(&mut self) -> Option<TrackId> {
        if self.active_tracks.is_empty() {
            return None;
        }
        let target = match self.nav.selection_mut().unselect() {
            Some(previous) => self
                .active_tracks
                .iter()
                .position(|id| *id == previous)
                .and_then(|index| index.checked_sub(1)),
            None => Some(self.active_tracks.len() - 1),
        };
        target.and_then(|index| self.select_active(index))
    }

    fn select_active(&mut self, index: usize) -> Option<TrackId> {
        let id = self.active_tracks.get(index)?.clone();
        self.nav.selection_mut().select(&id);
        Some(id)
    }

    /// Records a human label on `id`.
    pub fn label_track(&mut self, id: &str, label: Label) -> ReviewResult<()> {
        let track = self
            .data
            .as_mut()
            .and_then(|data| data.tracks.get_mut(id))
            .ok_or_else(|| ReviewError::UnknownTrack(id.to_string()))?;
        TrackAggregator::set_user_label(track, label);
        self.dirty = true;
        self.metrics.record_label();
        self.logger.record(&format!("track {} labeled {}", id, label));
        Ok(())
    }

    /// Labels the selected track. Returns false when nothing is selected.
    pub fn assign_label(&mut self, label: Label) -> ReviewResult<bool> {
        match self.nav.selected_track().cloned() {
            Some(id) => {
                self.label_track(&id, label)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_track_notes(&mut self, id: &str, notes: &str) -> ReviewResult<()> {
        let track = self
            .data
            .as_mut()
            .and_then(|data| data.tracks.get_mut(id))
            .ok_or_else(|| ReviewError::UnknownTrack(id.to_string()))?;
        track.notes = notes.to_string();
        self.dirty = true;
        Ok(())
    }

    /// Stores notes for the current day.
    pub fn set_day_notes(&mut self, notes: &str) -> ReviewResult<()> {
        if self.data.is_none() {
            return Err(ReviewError::NoBatch);
        }
        if self.nav.set_current_day_notes(notes) {
            self.dirty = true;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Applies a dispatched keyboard command. Returns whether anything changed.
    pub fn execute(&mut self, command: Command) -> ReviewResult<bool> {
        let changed = match command {
            Command::NextTrack => self.next_track().is_some(),
            Command::PrevTrack => self.prev_track().is_some(),
            Command::UnselectTrack => self.unselect_track().is_some(),
            Command::PrevDay => self.step_day(Step::Prev),
            Command::NextDay => self.step_day(Step::Next),
            Command::PrevFlaggedDay => self.step_day(Step::PrevFlagged),
            Command::NextFlaggedDay => self.step_day(Step::NextFlagged),
            Command::PrevFrame => self.step_frame(Step::Prev),
            Command::NextFrame => self.step_frame(Step::Next),
            Command::PrevFlaggedFrame => self.step_frame(Step::PrevFlagged),
            Command::NextFlaggedFrame => self.step_frame(Step::NextFlagged),
            Command::AssignLabel(label) => self.assign_label(label)?,
        };
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    pub fn export(&self) -> ReviewResult<ExportTable> {
        let data = self.data.as_ref().ok_or(ReviewError::NoBatch)?;
        Ok(ExportTransform::export(
            &data.detections,
            &data.tracks,
            self.nav.day_notes(),
        ))
    }

    pub fn export_filename(&self) -> ReviewResult<String> {
        self.nav
            .batch()
            .map(export_filename)
            .ok_or(ReviewError::NoBatch)
    }

    /// Writes the export as CSV and clears the unsaved-edits flag.
    pub fn write_export<W: Write>(&mut self, writer: W) -> ReviewResult<usize> {
        let table = self.export()?;
        table.write_csv(writer)?;
        self.dirty = false;
        self.metrics.record_export();
        self.logger.record(&format!(
            "exported {} rows for batch {}",
            table.rows.len(),
            self.nav.batch().unwrap_or_default()
        ));
        Ok(table.rows.len())
    }

    // ------------------------------------------------------------------
    // Renderer view
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(self)
    }

    /// Image URLs of the current frame, one per surface.
    pub fn frame_urls(&self) -> Vec<String> {
        match (&self.config, self.nav.current_frame()) {
            (Some(config), Some(frame)) => config.frame_urls(
                self.nav.dataset().unwrap_or_default(),
                self.nav.batch().unwrap_or_default(),
                frame,
            ),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests;
