pub mod aggregator;
pub mod label;
pub mod policy;
pub mod track;

pub use aggregator::{TrackAggregator, TrackTable};
pub use label::Label;
pub use policy::{FilterPolicy, PolicyOverrides};
pub use track::{SurfaceId, Track};
