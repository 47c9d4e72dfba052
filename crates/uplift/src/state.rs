//! Application state shared across HTTP handlers

use kameo::actor::ActorRef;
use tokio::sync::broadcast;
use uplift_api::events::WsEvent;
use uplift_core::UpgradeEngine;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Reference to the upgrade engine actor
    pub engine: ActorRef<UpgradeEngine>,
    /// Engine event channel, subscribed per WebSocket
    pub event_tx: broadcast::Sender<WsEvent>,
}

impl AppState {
    /// Create new application state
    pub fn new(engine: ActorRef<UpgradeEngine>, event_tx: broadcast::Sender<WsEvent>) -> Self {
        Self { engine, event_tx }
    }
}
