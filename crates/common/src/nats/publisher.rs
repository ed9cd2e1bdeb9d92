use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;

/// Narrow publish capability over JetStream, behind a trait so producers can
/// be tested without a broker.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JetStreamPublisher: Send + Sync {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()>;
}

#[async_trait]
impl JetStreamPublisher for async_nats::jetstream::Context {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        // Double await: the outer send, then the broker's ack
        async_nats::jetstream::Context::publish(self, subject, payload)
            .await
            .context("failed to publish message")?
            .await
            .context("message was not acknowledged by the broker")?;
        Ok(())
    }
}
