use async_trait::async_trait;
use scaler_core::{Result, ScalerError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Byte-oriented publish/subscribe contract. Schemas are owned outside
/// the bus; this crate only moves length-delimited-equivalent byte
/// payloads between producers and subscribers of a named topic.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
    async fn subscribe(&self, topic: &str) -> Result<Subscription>;
}

/// A live subscription to one topic. `recv` is cancel-safe, so a consumer
/// can `select!` it against a shutdown signal without losing a message.
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<Vec<u8>>,
}

impl Subscription {
    /// Blocks until the next message. On a slow-consumer lag, the oldest
    /// unread messages are dropped and this resumes from the next
    /// available one rather than erroring, since metric topics are
    /// naturally lossy under backpressure.
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Ok(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic, skipped, "subscriber lagged, dropping oldest messages");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(ScalerError::Upstream(format!(
                        "topic '{}' bus closed",
                        self.topic
                    )))
                }
            }
        }
    }
}

/// In-process bus backed by one `tokio::broadcast` channel per topic,
/// created lazily on first publish or subscribe.
pub struct InProcessBus {
    capacity: usize,
    channels: RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>,
}

impl InProcessBus {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            channels: RwLock::new(HashMap::new()),
        })
    }

    async fn sender_for(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        if let Some(sender) = self.channels.read().await.get(topic) {
            return sender.clone();
        }
        let mut channels = self.channels.write().await;
        channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

#[async_trait]
impl MessageBus for InProcessBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let sender = self.sender_for(topic).await;
        // No subscribers yet is not an error: telemetry topics are fire
        // and forget from the producer's point of view.
        let _ = sender.send(payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription> {
        let sender = self.sender_for(topic).await;
        Ok(Subscription {
            topic: topic.to_string(),
            receiver: sender.subscribe(),
        })
    }
}

/// Serializes `value` as JSON and publishes it on `topic`.
pub async fn publish_json<T: Serialize + Sync>(
    bus: &dyn MessageBus,
    topic: &str,
    value: &T,
) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    bus.publish(topic, payload).await
}

/// Awaits the next message on `subscription` and deserializes it as JSON.
pub async fn next_json<T: DeserializeOwned>(subscription: &mut Subscription) -> Result<T> {
    let payload = subscription.recv().await?;
    Ok(serde_json::from_slice(&payload)?)
}
