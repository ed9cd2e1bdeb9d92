pub mod clickhouse;
pub mod domain;
pub mod ingest_worker;
pub mod nats;

pub use clickhouse::ClickHouseMetricRepository;
pub use domain::{CounterSnapshot, IngestCounters, IngestOutcome, IngestionService, RejectReason};
pub use ingest_worker::{IngestWorker, IngestWorkerConfig};
pub use nats::{create_envelope_processor, run_demo_producer, DemoProducerConfig};
