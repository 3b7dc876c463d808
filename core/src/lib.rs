//! Core state engine for reviewing radar roost tracks.
//!
//! Detections are grouped into tracks and labeled by threshold rules,
//! days and frames are navigated through flag-aware sequences, and the
//! reviewed state is exported back onto every detection row.

pub mod config;
pub mod export;
pub mod math;
pub mod navigation;
pub mod prelude;
pub mod records;
pub mod session;
pub mod source;
pub mod telemetry;
pub mod tracks;

pub use prelude::{ChangeGuard, DataSource, ReviewError, ReviewResult, TrackId, Transition};
pub use session::ReviewSession;
