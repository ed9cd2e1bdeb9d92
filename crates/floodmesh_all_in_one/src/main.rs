mod config;

use std::sync::Arc;
use std::time::Duration;

use common::clickhouse::ClickHouseClient;
use common::nats::NatsClient;
use common::redis::RedisDedupStore;
use common::telemetry::{init_telemetry, TelemetryConfig};
use config::ServiceConfig;
use floodmesh_runner::Runner;
use ingest_worker::{run_demo_producer, DemoProducerConfig, IngestWorker, IngestWorkerConfig};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!("starting floodmesh-all-in-one service");
    debug!("configuration: {:?}", config);

    let (dedup_store, clickhouse_client, nats_client) =
        match initialize_shared_dependencies(&config).await {
            Ok(deps) => deps,
            Err(e) => {
                error!("failed to initialize shared dependencies: {}", e);
                std::process::exit(1);
            }
        };

    let ingest_worker = match IngestWorker::new(
        dedup_store,
        clickhouse_client,
        &nats_client,
        IngestWorkerConfig {
            raw_envelopes_stream: config.raw_envelopes_stream.clone(),
            raw_envelopes_subject: config.raw_envelopes_subject.clone(),
            consumer_name: config.ingest_consumer_name.clone(),
            nats_batch_size: config.nats_batch_size,
            nats_batch_wait_secs: config.nats_batch_wait_secs,
            metrics_table: config.metrics_table.clone(),
            dedup_retention: Duration::from_secs(config.dedup_retention_secs),
        },
    )
    .await
    {
        Ok(worker) => worker,
        Err(e) => {
            error!("failed to initialize ingest worker: {}", e);
            std::process::exit(1);
        }
    };

    let mut runner = Runner::new();
    runner = runner.with_boxed_process("ingest_worker", ingest_worker.into_runner_process());

    if config.demo_producer_enabled {
        let jetstream = Arc::new(nats_client.jetstream().clone());
        let demo_config = DemoProducerConfig {
            base_subject: config.raw_envelopes_stream.clone(),
            interval_ms: config.demo_producer_interval_ms,
            device_id: config.demo_producer_device_id.clone(),
            max_ttl: config.demo_producer_max_ttl,
        };
        runner = runner.with_named_process("demo_producer", move |ctx| async move {
            tokio::select! {
                _ = ctx.cancelled() => Ok(()),
                result = run_demo_producer(jetstream, demo_config) => result,
            }
        });
    }

    runner = runner
        .with_closer(|| async move {
            info!("running cleanup tasks...");
            // NATS and Redis connections close on drop
            info!("cleanup complete");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10));

    runner.run().await;
}

async fn initialize_shared_dependencies(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<RedisDedupStore>, ClickHouseClient, NatsClient)> {
    info!("initializing Redis...");
    let dedup_store = Arc::new(RedisDedupStore::connect(&config.redis_url).await?);

    info!("initializing ClickHouse...");
    let clickhouse_client = ClickHouseClient::new(
        &config.clickhouse_url,
        &config.clickhouse_database,
        &config.clickhouse_username,
        &config.clickhouse_password,
    );
    clickhouse_client.ping().await?;

    info!("initializing NATS...");
    let nats_client = NatsClient::connect(
        &config.nats_url,
        Duration::from_secs(config.startup_timeout_secs),
    )
    .await?;
    nats_client.ensure_stream(&config.raw_envelopes_stream).await?;

    Ok((dedup_store, clickhouse_client, nats_client))
}
