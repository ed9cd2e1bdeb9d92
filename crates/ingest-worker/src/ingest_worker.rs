use std::sync::Arc;
use std::time::Duration;

use common::clickhouse::ClickHouseClient;
use common::domain::DedupStore;
use common::nats::{NatsClient, NatsConsumer};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clickhouse::ClickHouseMetricRepository;
use crate::domain::IngestionService;
use crate::nats::create_envelope_processor;

pub struct IngestWorkerConfig {
    pub raw_envelopes_stream: String,
    pub raw_envelopes_subject: String,
    pub consumer_name: String,
    pub nats_batch_size: usize,
    pub nats_batch_wait_secs: u64,
    pub metrics_table: String,
    pub dedup_retention: Duration,
}

/// The ingestion side of the pipeline, assembled: gateway service wired to
/// the dedup store and ClickHouse, driven by a JetStream consumer.
pub struct IngestWorker {
    consumer: NatsConsumer,
    service: Arc<IngestionService>,
}

impl IngestWorker {
    pub async fn new(
        dedup_store: Arc<dyn DedupStore>,
        clickhouse_client: ClickHouseClient,
        nats_client: &NatsClient,
        config: IngestWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!("initializing ingest worker");

        let metric_repository = ClickHouseMetricRepository::new(
            clickhouse_client,
            config.metrics_table.clone(),
        );
        let service = Arc::new(IngestionService::new(
            dedup_store,
            Arc::new(metric_repository),
            config.dedup_retention,
        ));

        let processor = create_envelope_processor(Arc::clone(&service));
        let consumer = NatsConsumer::new(
            nats_client.jetstream(),
            &config.raw_envelopes_stream,
            &config.consumer_name,
            &config.raw_envelopes_subject,
            config.nats_batch_size,
            config.nats_batch_wait_secs,
            processor,
        )
        .await?;

        info!("ingest worker initialized");

        Ok(Self { consumer, service })
    }

    pub fn service(&self) -> Arc<IngestionService> {
        Arc::clone(&self.service)
    }

    pub fn into_runner_process(
        self,
    ) -> Box<
        dyn FnOnce(
                CancellationToken,
            ) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
            > + Send,
    > {
        Box::new({
            let consumer = self.consumer;
            move |ctx| Box::pin(async move { consumer.run(ctx).await })
        })
    }
}
