//! WebSocket Subscriber Hub
//!
//! Owns the set of connected dashboard clients and broadcasts rendered
//! update frames to every one of them. One mutex guards registration,
//! removal, and enumeration-with-delivery, so broadcasts never race
//! against connect/disconnect.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Unique identity of one connected subscriber.
///
/// Identity-based, never derived from payload content: each connection
/// handler owns exactly one id for its whole lifetime.
pub type SubscriberId = Uuid;

/// Configuration for the subscriber hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each subscriber's delivery queue
    pub queue_capacity: usize,
    /// Deadline for a single frame write to a subscriber's socket
    pub write_timeout: Duration,
    /// Maximum number of concurrent subscribers
    pub max_subscribers: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            write_timeout: Duration::from_secs(1),
            max_subscribers: 1024,
        }
    }
}

/// Registry and broadcaster for all connected dashboard clients.
///
/// A subscriber is present in the registry exactly while its connection
/// handler is running; the handler removes it on every exit path.
pub struct SubscriberHub {
    /// Active subscribers: id → sending half of the delivery queue
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Vec<u8>>>>,
    config: HubConfig,
}

impl SubscriberHub {
    /// Create a new hub with no subscribers
    pub fn new(config: HubConfig) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Register a new subscriber.
    ///
    /// Creates the bounded delivery queue and returns its id together with
    /// the receiving half, or an error if the subscriber limit is reached.
    pub async fn register(
        &self,
    ) -> Result<(SubscriberId, mpsc::Receiver<Vec<u8>>), HubError> {
        let mut subscribers = self.subscribers.lock().await;
        if subscribers.len() >= self.config.max_subscribers {
            return Err(HubError::SubscriberLimit {
                limit: self.config.max_subscribers,
            });
        }

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        subscribers.insert(id, tx);

        tracing::info!(subscriber_id = %id, "subscriber registered");
        Ok((id, rx))
    }

    /// Remove a subscriber.
    ///
    /// No-op if the id is absent, so cleanup paths may call it more than
    /// once.
    pub async fn unregister(&self, id: SubscriberId) {
        let removed = self.subscribers.lock().await.remove(&id);
        if removed.is_some() {
            tracing::info!(subscriber_id = %id, "subscriber removed");
        }
    }

    /// Enqueue a payload onto every registered subscriber's queue.
    ///
    /// The registry lock is held for the whole delivery pass and each
    /// enqueue awaits queue space, so one subscriber with a full queue
    /// stalls the broadcast and blocks registration changes until its
    /// write pump drains a slot. A send to a subscriber whose receiver is
    /// already gone is skipped; that subscriber is mid-teardown and will
    /// remove itself.
    pub async fn publish(&self, payload: &[u8]) {
        let subscribers = self.subscribers.lock().await;
        for (id, queue) in subscribers.iter() {
            if queue.send(payload.to_vec()).await.is_err() {
                tracing::debug!(subscriber_id = %id, "skipping closed subscriber queue");
            }
        }
    }

    /// Number of currently registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Per-write deadline for connection handlers
    pub fn write_timeout(&self) -> Duration {
        self.config.write_timeout
    }
}

/// Errors that can occur when registering with the hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("subscriber limit reached (limit: {limit})")]
    SubscriberLimit { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn small_hub(queue_capacity: usize) -> SubscriberHub {
        SubscriberHub::new(HubConfig {
            queue_capacity,
            ..HubConfig::default()
        })
    }

    #[test]
    fn default_config() {
        let config = HubConfig::default();
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.write_timeout, Duration::from_secs(1));
        assert_eq!(config.max_subscribers, 1024);
    }

    #[tokio::test]
    async fn register_and_unregister() {
        let hub = SubscriberHub::new(HubConfig::default());

        let (id, _rx) = hub.register().await.unwrap();
        assert_eq!(hub.subscriber_count().await, 1);

        hub.unregister(id).await;
        assert_eq!(hub.subscriber_count().await, 0);

        // Cleanup may run more than once
        hub.unregister(id).await;
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn subscriber_limit() {
        let hub = SubscriberHub::new(HubConfig {
            max_subscribers: 2,
            ..HubConfig::default()
        });

        let (_id1, _rx1) = hub.register().await.unwrap();
        let (_id2, _rx2) = hub.register().await.unwrap();
        let result = hub.register().await;

        assert!(matches!(
            result,
            Err(HubError::SubscriberLimit { limit: 2 })
        ));
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber_once() {
        let hub = SubscriberHub::new(HubConfig::default());

        let (_a, mut rx_a) = hub.register().await.unwrap();
        let (_b, mut rx_b) = hub.register().await.unwrap();

        hub.publish(b"ping").await;

        assert_eq!(rx_a.recv().await.unwrap(), b"ping");
        assert_eq!(rx_b.recv().await.unwrap(), b"ping");
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn delivery_is_fifo_per_subscriber() {
        let hub = SubscriberHub::new(HubConfig::default());
        let (_id, mut rx) = hub.register().await.unwrap();

        hub.publish(b"first").await;
        hub.publish(b"second").await;
        hub.publish(b"third").await;

        assert_eq!(rx.recv().await.unwrap(), b"first");
        assert_eq!(rx.recv().await.unwrap(), b"second");
        assert_eq!(rx.recv().await.unwrap(), b"third");
    }

    #[tokio::test]
    async fn removed_subscriber_receives_nothing_further() {
        let hub = SubscriberHub::new(HubConfig::default());

        let (a, mut rx_a) = hub.register().await.unwrap();
        let (_b, mut rx_b) = hub.register().await.unwrap();

        hub.unregister(a).await;
        hub.publish(b"update").await;

        assert_eq!(rx_b.recv().await.unwrap(), b"update");
        // The sender was dropped on removal, so the queue reports closed
        assert!(rx_a.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_queue_is_skipped_without_stalling_others() {
        let hub = SubscriberHub::new(HubConfig::default());

        let (_a, rx_a) = hub.register().await.unwrap();
        let (_b, mut rx_b) = hub.register().await.unwrap();

        // Subscriber A's pump is gone but A has not deregistered yet
        drop(rx_a);

        hub.publish(b"update").await;
        assert_eq!(rx_b.recv().await.unwrap(), b"update");
    }

    /// The deliberate coupling of this design: a saturated subscriber
    /// stalls the whole broadcast, and the stalled broadcast holds the
    /// registry lock.
    #[tokio::test]
    async fn saturated_subscriber_stalls_broadcast_and_registry() {
        let hub = Arc::new(small_hub(1));

        let (_a, mut rx_a) = hub.register().await.unwrap();
        let (_b, mut rx_b) = hub.register().await.unwrap();

        // Fill both queues, then drain B so only A stays saturated
        hub.publish(b"one").await;
        assert_eq!(rx_b.recv().await.unwrap(), b"one");

        // A is saturated, so the next broadcast cannot complete
        let publisher = {
            let hub = Arc::clone(&hub);
            tokio::spawn(async move { hub.publish(b"two").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!publisher.is_finished());

        // And registry operations are blocked behind the same lock
        let count =
            tokio::time::timeout(Duration::from_millis(50), hub.subscriber_count()).await;
        assert!(
            count.is_err(),
            "registry lock should be held by the stalled broadcast"
        );

        // Draining A unblocks everything
        assert_eq!(rx_a.recv().await.unwrap(), b"one");
        publisher.await.unwrap();

        assert_eq!(rx_a.recv().await.unwrap(), b"two");
        assert_eq!(rx_b.recv().await.unwrap(), b"two");
        assert_eq!(hub.subscriber_count().await, 2);
    }
}
