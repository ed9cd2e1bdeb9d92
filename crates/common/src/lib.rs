pub mod clickhouse;
pub mod domain;
pub mod nats;
pub mod redis;
pub mod telemetry;

pub use clickhouse::ClickHouseClient;
pub use nats::{BatchProcessor, NatsClient, NatsConsumer, ProcessingResult};

// Re-export mocks when the testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDedupStore;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockMetricSink;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockJetStreamPublisher;
