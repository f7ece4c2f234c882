//! Application State
//!
//! Shared state accessible by all HTTP handlers. The subscriber hub lives
//! here so the sampler and every connection handler share one instance;
//! there is no global registry.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, ServerConfig};
use crate::websocket::SubscriberHub;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// WebSocket subscriber hub: registry plus broadcaster
    pub hub: Arc<SubscriberHub>,
    /// HTTP server configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Build state from the loaded configuration
    pub fn new(config: &Config) -> Self {
        Self {
            hub: Arc::new(SubscriberHub::new(config.broadcast.hub_config())),
            config: Arc::new(config.server.clone()),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
