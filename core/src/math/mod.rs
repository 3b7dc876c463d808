pub mod stats;

pub use stats::{ScoreSummary, StatsHelper};
