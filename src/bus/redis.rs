//! Redis-backed bus: one pub/sub connection per subscribed topic, with
//! exponential backoff on reconnect instead of a hot retry loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bus::{Bus, BusSubscription};
use crate::error::HubResult;

const SUBSCRIPTION_BUFFER: usize = 64;
const RETRY_INITIAL: Duration = Duration::from_millis(100);
const RETRY_MAX: Duration = Duration::from_secs(5);

/// Redis pub/sub bus shared by all hub instances pointing at the same server.
#[derive(Clone)]
pub struct RedisBus {
    client: Arc<redis::Client>,
}

impl RedisBus {
    /// Create a bus from a Redis URL.
    pub fn new(redis_url: &str) -> HubResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, topic: &str, payload: &str) -> HubResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let receivers: u64 = conn.publish(topic, payload).await?;
        debug!(topic = %topic, receivers, "published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> HubResult<BusSubscription> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let client = self.client.clone();
        let topic = topic.to_string();

        tokio::spawn(async move {
            let mut retry = RETRY_INITIAL;
            loop {
                match drain_topic(&client, &topic, &tx).await {
                    Ok(()) => return,
                    Err(e) => {
                        warn!(
                            topic = %topic,
                            error = %e,
                            retry_ms = retry.as_millis() as u64,
                            "bus receive failed, reconnecting"
                        );
                    }
                }
                tokio::select! {
                    _ = tx.closed() => return,
                    _ = tokio::time::sleep(retry) => {}
                }
                retry = (retry * 2).min(RETRY_MAX);
            }
        });

        Ok(BusSubscription::new(rx))
    }
}

/// Forward payloads from one pub/sub connection until the subscriber hangs up
/// (`Ok`) or the connection dies (`Err`, caller reconnects).
async fn drain_topic(
    client: &redis::Client,
    topic: &str,
    tx: &mpsc::Sender<String>,
) -> Result<(), redis::RedisError> {
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.subscribe(topic).await?;
    info!(topic = %topic, "subscribed to redis topic");

    let mut stream = pubsub.into_on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                warn!(topic = %topic, error = %e, "dropping unreadable bus payload");
                continue;
            }
        };
        if tx.send(payload).await.is_err() {
            return Ok(());
        }
    }

    Err((redis::ErrorKind::IoError, "pub/sub stream ended").into())
}
