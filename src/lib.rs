//! # Hostpulse
//!
//! Live host-metrics dashboard backend. A sampler reads CPU, memory, and
//! disk counters on a fixed interval, renders them into an htmx fragment,
//! and a WebSocket hub pushes that fragment to every connected browser.
//!
//! ## Modules
//!
//! - [`websocket`]: subscriber registry, broadcaster, connection handling
//! - [`sampler`]: the periodic driver loop and `/proc` metric producers
//! - [`render`]: htmx fragment and dashboard page rendering
//! - [`server`]: Axum HTTP layer (`/`, `/health`, `/ws`)
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hostpulse::{serve, AppState, Config, Sampler};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let state = AppState::new(&config);
//!
//!     let sampler = Sampler::new(Arc::clone(&state.hub), config.sampler.interval());
//!     tokio::spawn(sampler.run());
//!
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod render;
pub mod sampler;
pub mod server;
pub mod websocket;

pub use config::{BroadcastConfig, Config, ConfigError, LoggingConfig, SamplerConfig, ServerConfig};

pub use sampler::{MetricProducer, SampleError, Sampler};

pub use server::{build_router, serve, AppState, ServerError};

pub use websocket::{
    ws_handler, ConnectionError, HubConfig, HubError, SubscriberHub, SubscriberId,
};
