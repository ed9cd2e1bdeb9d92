use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use common::domain::Envelope;
use common::nats::JetStreamPublisher;
use rand::Rng;
use tokio::time::{interval, Duration};
use tracing::info;

/// Configuration for the demo envelope producer
#[derive(Debug, Clone)]
pub struct DemoProducerConfig {
    pub base_subject: String,
    pub interval_ms: u64,
    pub device_id: String,
    pub max_ttl: u32,
}

/// Publish synthetic wire envelopes at a fixed interval.
///
/// Stands in for the mesh edge during smoke runs: each tick floods one
/// fresh reading with random temperature and humidity values into the raw
/// envelope stream.
pub async fn run_demo_producer(
    jetstream: Arc<dyn JetStreamPublisher>,
    config: DemoProducerConfig,
) -> Result<()> {
    info!(
        base_subject = %config.base_subject,
        interval_ms = config.interval_ms,
        device_id = %config.device_id,
        "starting demo envelope producer"
    );

    let mut ticker = interval(Duration::from_millis(config.interval_ms));

    loop {
        ticker.tick().await;

        let mut values = BTreeMap::new();
        {
            let mut rng = rand::thread_rng();
            values.insert(
                "temperature".to_string(),
                rng.gen_range(15.0f64..30.0).round(),
            );
            values.insert("humidity".to_string(), rng.gen_range(20.0f64..80.0).round());
        }

        let envelope = Envelope::new(config.device_id.clone(), values, config.max_ttl);
        let encoded = envelope.encode();
        let size_bytes = encoded.len();
        let subject = format!("{}.{}", config.base_subject, config.device_id);

        jetstream
            .publish(subject.clone(), Bytes::from(encoded))
            .await
            .context("failed to publish demo envelope")?;

        info!(
            subject = %subject,
            message_id = %envelope.message_id,
            size_bytes = size_bytes,
            "published demo envelope"
        );
    }
}
