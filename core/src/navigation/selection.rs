use std::time::{Duration, Instant};

use crate::prelude::TrackId;

/// Delay between the pointer leaving a track and its unselection.
pub const UNSELECT_DELAY: Duration = Duration::from_millis(250);

/// Handle returned when an unselect is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnselectToken(u64);

#[derive(Debug, Clone, Copy)]
struct Pending {
    token: UnselectToken,
    due: Instant,
}

/// Result of a selection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    /// The track was already selected; any pending unselect was cancelled.
    Unchanged,
    /// A new track is selected; `previous` was torn down first.
    Selected { previous: Option<TrackId> },
}

/// Currently selected track plus at most one deferred unselect.
#[derive(Debug, Clone)]
pub struct Selection {
    selected: Option<TrackId>,
    pending: Option<Pending>,
    next_token: u64,
    delay: Duration,
}

impl Default for Selection {
    fn default() -> Self {
        Self::with_delay(UNSELECT_DELAY)
    }
}

impl Selection {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            selected: None,
            pending: None,
            next_token: 0,
            delay,
        }
    }

    pub fn selected(&self) -> Option<&TrackId> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, track: &str) -> SelectionChange {
        if self.selected.as_deref() == Some(track) {
            self.pending = None;
            return SelectionChange::Unchanged;
        }
        let previous = self.unselect();
        self.selected = Some(track.to_string());
        SelectionChange::Selected { previous }
    }

    /// Clears the selection and any pending unselect. Returns the torn-down track.
    pub fn unselect(&mut self) -> Option<TrackId> {
        self.pending = None;
        self.selected.take()
    }

    /// Schedules an unselect `delay` after `now`, replacing any earlier one.
    pub fn schedule_unselect(&mut self, now: Instant) -> Option<UnselectToken> {
        self.selected.as_ref()?;
        let token = UnselectToken(self.next_token);
        self.next_token += 1;
        self.pending = Some(Pending {
            token,
            due: now + self.delay,
        });
        Some(token)
    }

    /// Cancels the pending unselect if `token` still identifies it.
    pub fn cancel(&mut self, token: UnselectToken) -> bool {
        match self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fires the pending unselect if it is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<TrackId> {
        match self.pending {
            Some(pending) if now >= pending.due => self.unselect(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selecting_another_track_tears_down_the_previous_one() {
        let mut selection = Selection::default();
        assert_eq!(
            selection.select("A"),
            SelectionChange::Selected { previous: None }
        );
        assert_eq!(
            selection.select("B"),
            SelectionChange::Selected {
                previous: Some("A".into())
            }
        );
        assert_eq!(selection.selected().map(String::as_str), Some("B"));
    }

    #[test]
    fn deferred_unselect_fires_after_delay() {
        let mut selection = Selection::default();
        let start = Instant::now();
        selection.select("A");
        selection.schedule_unselect(start).unwrap();
        assert_eq!(selection.poll(start + Duration::from_millis(100)), None);
        assert_eq!(
            selection.poll(start + UNSELECT_DELAY),
            Some("A".to_string())
        );
        assert!(selection.selected().is_none());
    }

    #[test]
    fn reselecting_cancels_pending_unselect() {
        let mut selection = Selection::default();
        let start = Instant::now();
        selection.select("A");
        selection.schedule_unselect(start);
        assert_eq!(selection.select("A"), SelectionChange::Unchanged);
        assert!(!selection.has_pending());
        assert_eq!(selection.poll(start + Duration::from_secs(1)), None);
        assert!(selection.selected().is_some());
    }

    #[test]
    fn stale_tokens_do_not_cancel_newer_schedules() {
        let mut selection = Selection::default();
        let start = Instant::now();
        selection.select("A");
        let first = selection.schedule_unselect(start).unwrap();
        let second = selection.schedule_unselect(start).unwrap();
        assert!(!selection.cancel(first));
        assert!(selection.cancel(second));
        assert!(selection.schedule_unselect(start).is_some());
    }

    #[test]
    fn nothing_to_schedule_without_a_selection() {
        let mut selection = Selection::default();
        assert!(selection.schedule_unselect(Instant::now()).is_none());
    }
}
