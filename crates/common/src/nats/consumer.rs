use std::time::Duration;

use anyhow::{Context, Result};
use async_nats::jetstream::{self, consumer::PullConsumer, Message};
use futures::{future::BoxFuture, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Disposition of one fetched batch: which messages to Ack and which to Nak
/// for redelivery, by index into the batch.
#[derive(Debug)]
pub struct ProcessingResult {
    pub ack: Vec<usize>,
    pub nak: Vec<(usize, Option<String>)>,
}

impl ProcessingResult {
    pub fn ack_all(count: usize) -> Self {
        Self {
            ack: (0..count).collect(),
            nak: Vec::new(),
        }
    }

    pub fn nak_all(count: usize, error: Option<String>) -> Self {
        Self {
            ack: Vec::new(),
            nak: (0..count).map(|i| (i, error.clone())).collect(),
        }
    }
}

/// Batch processor function. Receives the raw fetched messages and decides
/// per-message acknowledgment; deserialization and business logic live in
/// the processor, not the consumer.
pub type BatchProcessor =
    Box<dyn Fn(&[Message]) -> BoxFuture<'static, Result<ProcessingResult>> + Send + Sync>;

/// JetStream pull consumer driving a [`BatchProcessor`] until cancellation.
///
/// Unacknowledged and Nak'd messages are redelivered by the broker; this is
/// the upstream retry mechanism the gateway itself deliberately lacks.
pub struct NatsConsumer {
    consumer: PullConsumer,
    batch_size: usize,
    max_wait: Duration,
    processor: BatchProcessor,
}

impl NatsConsumer {
    pub async fn new(
        jetstream: &jetstream::Context,
        stream_name: &str,
        consumer_name: &str,
        subject_filter: &str,
        batch_size: usize,
        max_wait_secs: u64,
        processor: BatchProcessor,
    ) -> Result<Self> {
        debug!(
            stream = stream_name,
            consumer = consumer_name,
            subject = subject_filter,
            "creating JetStream consumer"
        );

        // Create or look up the durable consumer
        let consumer = jetstream
            .create_consumer_on_stream(
                jetstream::consumer::pull::Config {
                    name: Some(consumer_name.to_string()),
                    durable_name: Some(consumer_name.to_string()),
                    filter_subject: subject_filter.to_string(),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
                stream_name,
            )
            .await
            .context("failed to create consumer")?;

        info!(
            stream = stream_name,
            consumer = consumer_name,
            "consumer created"
        );

        Ok(Self {
            consumer,
            batch_size,
            max_wait: Duration::from_secs(max_wait_secs),
            processor,
        })
    }

    pub async fn run(&self, ctx: CancellationToken) -> Result<()> {
        info!("starting consumer loop");

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("shutdown requested, stopping consumer");
                    break;
                }
                result = self.fetch_and_process_batch() => {
                    if let Err(e) = result {
                        error!(error = %e, "error processing batch");
                        // A bad batch never halts the consumer
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!("consumer stopped");
        Ok(())
    }

    async fn fetch_and_process_batch(&self) -> Result<()> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(self.batch_size)
            .expires(self.max_wait)
            .messages()
            .await
            .context("failed to fetch messages")?;

        let mut batch = Vec::new();
        while let Some(result) = messages.next().await {
            match result {
                Ok(msg) => batch.push(msg),
                Err(e) => {
                    warn!(error = %e, "error receiving message from batch");
                }
            }
        }

        if batch.is_empty() {
            return Ok(());
        }

        debug!(message_count = batch.len(), "received message batch");

        let result = match (self.processor)(&batch).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "processor failed, rejecting whole batch");
                ProcessingResult::nak_all(batch.len(), Some(e.to_string()))
            }
        };

        for idx in result.ack {
            match batch.get(idx) {
                Some(msg) => {
                    if let Err(e) = msg.ack().await {
                        error!(error = %e, message_index = idx, "failed to acknowledge message");
                    }
                }
                None => warn!(
                    message_index = idx,
                    batch_size = batch.len(),
                    "ack index out of range"
                ),
            }
        }

        for (idx, reason) in result.nak {
            match batch.get(idx) {
                Some(msg) => {
                    warn!(
                        message_index = idx,
                        subject = %msg.subject,
                        reason = reason.as_deref().unwrap_or("unspecified"),
                        "rejecting message for redelivery"
                    );
                    if let Err(e) = msg.ack_with(jetstream::AckKind::Nak(None)).await {
                        error!(error = %e, message_index = idx, "failed to reject message");
                    }
                }
                None => warn!(
                    message_index = idx,
                    batch_size = batch.len(),
                    "nak index out of range"
                ),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_all_covers_every_index() {
        let result = ProcessingResult::ack_all(3);

        assert_eq!(result.ack, vec![0, 1, 2]);
        assert!(result.nak.is_empty());
    }

    #[test]
    fn test_nak_all_carries_the_error() {
        let result = ProcessingResult::nak_all(2, Some("store unavailable".to_string()));

        assert!(result.ack.is_empty());
        assert_eq!(result.nak.len(), 2);
        assert_eq!(result.nak[0].1.as_deref(), Some("store unavailable"));
    }
}
