//! WebSocket Broadcast Core
//!
//! Pushes rendered dashboard updates to every connected browser client.
//!
//! ## Architecture
//!
//! - **SubscriberHub**: registry of live subscribers plus the broadcaster
//!   that fans one payload out to every delivery queue
//! - **Handler**: upgrades the connection and pumps queued frames to the
//!   wire, tearing down on close, write failure, or timeout
//!
//! The hub interprets nothing: payloads are opaque UTF-8 fragments handed
//! in by the sampler and forwarded verbatim as text frames.

mod handler;
mod hub;

pub use handler::{ws_handler, ConnectionError};
pub use hub::{HubConfig, HubError, SubscriberHub, SubscriberId};
