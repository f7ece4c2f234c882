//! Host Metric Sampler
//!
//! The driver loop behind the dashboard: on a fixed interval it samples
//! every metric producer, renders one update fragment, and hands it to the
//! subscriber hub. A cycle is all-or-nothing; if any producer fails, that
//! cycle broadcasts nothing and the error is reported for the operator.

mod host;

pub use host::{CpuProducer, DiskProducer, SystemProducer};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::render::{self, Section};
use crate::websocket::SubscriberHub;

/// One source of rendered dashboard data.
///
/// Producers are simple value sources: synchronous, infallible to call,
/// fallible in result. The sampler treats their output as opaque HTML.
pub trait MetricProducer: Send + Sync {
    /// Name used in skip-cycle diagnostics
    fn name(&self) -> &'static str;

    /// Element id on the index page this producer's section swaps into
    fn target(&self) -> &'static str;

    /// Produce the rendered section for the current sample
    fn sample(&self) -> Result<String, SampleError>;
}

/// Errors from metric producers
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected format in {path}: {detail}")]
    Parse { path: String, detail: String },
}

/// Periodic driver that broadcasts rendered host metrics
pub struct Sampler {
    hub: Arc<SubscriberHub>,
    producers: Vec<Box<dyn MetricProducer>>,
    interval: Duration,
}

impl Sampler {
    /// Create a sampler with the standard system/CPU/disk producers
    pub fn new(hub: Arc<SubscriberHub>, interval: Duration) -> Self {
        Self::with_producers(
            hub,
            interval,
            vec![
                Box::new(SystemProducer::new()),
                Box::new(CpuProducer::new()),
                Box::new(DiskProducer::new()),
            ],
        )
    }

    /// Create a sampler with a custom producer set
    pub fn with_producers(
        hub: Arc<SubscriberHub>,
        interval: Duration,
        producers: Vec<Box<dyn MetricProducer>>,
    ) -> Self {
        Self {
            hub,
            producers,
            interval,
        }
    }

    /// Run the driver loop forever.
    ///
    /// Spawn this on its own task; it never returns.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            producers = self.producers.len(),
            "starting metric sampler"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Execute one sampling cycle.
    ///
    /// Publishes exactly one fragment when every producer succeeds, and
    /// nothing at all otherwise.
    pub async fn tick(&self) {
        match self.snapshot() {
            Ok(sections) => {
                let fragment = render::update_fragment(chrono::Local::now(), &sections);
                self.hub.publish(fragment.as_bytes()).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "sampling cycle failed, skipping broadcast");
            }
        }
    }

    /// Sample every producer, failing the whole snapshot on the first error
    fn snapshot(&self) -> Result<Vec<Section>, SampleError> {
        let mut sections = Vec::with_capacity(self.producers.len());
        for producer in &self.producers {
            let html = producer.sample().map_err(|e| {
                tracing::debug!(producer = producer.name(), error = %e, "producer failed");
                e
            })?;
            sections.push(Section {
                target: producer.target(),
                html,
            });
        }
        Ok(sections)
    }
}
