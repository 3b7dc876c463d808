use crate::gui_bridge::model::SnapshotModel;
use log::{error, info};
use roostcore::session::SessionSnapshot;
use std::{
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::Filter;

pub fn bridge_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

type SharedModel = Arc<RwLock<SnapshotModel>>;

/// Holds the latest session snapshot and optionally serves it over HTTP.
#[derive(Clone, Default)]
pub struct SnapshotBridge {
    state: SharedModel,
}

impl SnapshotBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `GET /snapshot` on `address` from a background thread.
    pub fn serve(&self, address: SocketAddr) {
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());
        let snapshot_route = warp::path("snapshot")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter)
            .map(|state: SharedModel| {
                let model = state.read().unwrap_or_else(PoisonError::into_inner);
                warp::reply::json(&*model)
            });

        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build bridge runtime: {}", err);
                    return;
                }
            };
            runtime.block_on(async move {
                warp::serve(snapshot_route).run(address).await;
            });
        });
        info!("snapshot bridge listening on http://{}/snapshot", address);
    }

    pub fn publish(&self, snapshot: SessionSnapshot) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(snapshot);
    }

    pub fn publish_status(&self, message: &str) {
        println!("[bridge] {}", message);
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        guard.status = message.to_string();
    }

    #[cfg(test)]
    pub fn model(&self) -> SnapshotModel {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
