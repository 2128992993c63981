//! In-process bus over tokio broadcast channels, for tests and
//! single-instance deployments that do not need a shared backplane.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::debug;

use crate::bus::{Bus, BusSubscription};
use crate::error::HubResult;

const TOPIC_BUFFER: usize = 64;

/// A bus that never leaves the process. Topic semantics match [`RedisBus`]:
/// publishing to a topic with no subscribers succeeds and drops the payload.
///
/// [`RedisBus`]: crate::bus::RedisBus
#[derive(Clone, Default)]
pub struct MemoryBus {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        let mut topics = self.topics.lock().await;
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_BUFFER).0)
            .clone()
    }

    /// Number of live subscriptions on a topic. Used by tests to observe
    /// subscription teardown.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.topics.lock().await;
        topics.get(topic).map_or(0, |tx| tx.receiver_count())
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, topic: &str, payload: &str) -> HubResult<()> {
        let receivers = self.sender(topic).await.send(payload.to_string()).unwrap_or(0);
        debug!(topic = %topic, receivers, "published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> HubResult<BusSubscription> {
        let mut topic_rx = self.sender(topic).await.subscribe();
        let (tx, rx) = mpsc::channel(TOPIC_BUFFER);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => return,
                    received = topic_rx.recv() => match received {
                        Ok(payload) => {
                            if tx.send(payload).await.is_err() {
                                return;
                            }
                        }
                        // Lagged receivers lose payloads, matching the
                        // at-most-once drop on a transient Redis outage.
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                }
            }
        });

        Ok(BusSubscription::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("42").await.unwrap();
        bus.publish("42", "hello").await.unwrap();
        let payload = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .unwrap();
        assert_eq!(payload.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = MemoryBus::new();
        bus.publish("nowhere", "dropped").await.unwrap();
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = MemoryBus::new();
        let mut sub_a = bus.subscribe("a").await.unwrap();
        let _sub_b = bus.subscribe("b").await.unwrap();
        bus.publish("b", "for-b").await.unwrap();
        bus.publish("a", "for-a").await.unwrap();
        let payload = tokio::time::timeout(Duration::from_secs(1), sub_a.recv())
            .await
            .unwrap();
        assert_eq!(payload.as_deref(), Some("for-a"));
    }

    #[tokio::test]
    async fn dropping_subscription_releases_topic() {
        let bus = MemoryBus::new();
        let sub = bus.subscribe("9").await.unwrap();
        assert_eq!(bus.subscriber_count("9").await, 1);
        drop(sub);
        // the forwarding task notices the dropped receiver on its next poll
        for _ in 0..50 {
            if bus.subscriber_count("9").await == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("subscription not released");
    }
}
