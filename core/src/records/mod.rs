pub mod detection;
pub mod fields;
pub mod scan;

pub use detection::{Detection, PriorReview};
pub use fields::FieldMap;
pub use scan::{format_day, format_time, parse_local_date, parse_scan, Scan, ScanInfo};
