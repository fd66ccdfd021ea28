use std::sync::Arc;

use jobrelay_db::JobStore;

use crate::config::ServerConfig;
use crate::engine::{Dispatcher, Poller};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Job store shared by the dispatcher, poller, and coordinator.
    pub store: Arc<dyn JobStore>,
    /// Accepts submissions and enqueues triggers.
    pub dispatcher: Arc<Dispatcher>,
    /// Read-only job status view.
    pub poller: Poller,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
