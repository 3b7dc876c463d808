use log::{debug, info, warn};

/// Logging facade scoped to one component target.
pub struct LogManager {
    target: &'static str,
}

impl LogManager {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn record(&self, message: &str) {
        info!(target: self.target, "{}", message);
    }

    pub fn trace_move(&self, message: &str) {
        debug!(target: self.target, "{}", message);
    }

    pub fn skipped_row(&self, kind: &str, line: usize, reason: &dyn std::fmt::Display) {
        warn!(target: self.target, "skipping {} row {}: {}", kind, line, reason);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("roostcore")
    }
}
