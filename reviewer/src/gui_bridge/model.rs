use roostcore::session::SessionSnapshot;
use serde::{Deserialize, Serialize};

/// State served to an external renderer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SnapshotModel {
    pub status: String,
    pub revision: u64,
    pub snapshot: Option<SessionSnapshot>,
}

impl SnapshotModel {
    pub fn replace(&mut self, snapshot: SessionSnapshot) {
        self.snapshot = Some(snapshot);
        self.revision += 1;
    }
}
