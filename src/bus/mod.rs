//! Bus adapter: the topic-addressed publish/subscribe backplane connecting
//! independent hub instances.
//!
//! Every chat message and membership update round-trips through the bus, even
//! on the instance that produced it. That round trip is what gives every
//! channel a single bus-defined message order across all instances.

pub mod memory;
pub mod redis;

pub use self::redis::RedisBus;
pub use memory::MemoryBus;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::HubResult;

/// Reserved topic carrying membership updates between instances.
pub const MEMBERSHIP_TOPIC: &str = "membership";

/// Topic name for a channel: the decimal string of its id.
pub fn channel_topic(channel_id: i64) -> String {
    channel_id.to_string()
}

/// At-least-once publish/subscribe addressed by topic name.
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    /// Publish a payload to a topic. Zero subscribers is not an error.
    async fn publish(&self, topic: &str, payload: &str) -> HubResult<()>;

    /// Subscribe to a topic. The subscription stays live (reconnecting if the
    /// backend allows it) until the returned handle is dropped.
    async fn subscribe(&self, topic: &str) -> HubResult<BusSubscription>;
}

/// A live subscription to one topic. Dropping it ends the subscription and
/// stops the driving task.
pub struct BusSubscription {
    rx: mpsc::Receiver<String>,
}

impl BusSubscription {
    pub(crate) fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }

    /// A subscription that yields nothing and ends immediately. Stands in
    /// when a bus backend fails to subscribe, so refcount bookkeeping stays
    /// consistent while the failure is logged.
    pub(crate) fn closed() -> Self {
        let (_, rx) = mpsc::channel(1);
        Self { rx }
    }

    /// Next payload off the topic; `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
