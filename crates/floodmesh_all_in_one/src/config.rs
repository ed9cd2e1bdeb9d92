use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// NATS JetStream stream name for raw envelope bytes
    #[serde(default = "default_raw_envelopes_stream")]
    pub raw_envelopes_stream: String,

    /// NATS subject pattern for the ingest consumer filter
    #[serde(default = "default_raw_envelopes_subject")]
    pub raw_envelopes_subject: String,

    /// Durable consumer name for the ingestion gateway
    #[serde(default = "default_ingest_consumer_name")]
    pub ingest_consumer_name: String,

    /// Batch size for the consumer
    #[serde(default = "default_nats_batch_size")]
    pub nats_batch_size: usize,

    /// Max wait time for batches in seconds
    #[serde(default = "default_nats_batch_wait_secs")]
    pub nats_batch_wait_secs: u64,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Dedup store configuration
    /// Redis URL for the dedup store
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Dedup retention window in seconds
    #[serde(default = "default_dedup_retention_secs")]
    pub dedup_retention_secs: u64,

    // ClickHouse configuration
    /// ClickHouse HTTP URL
    #[serde(default = "default_clickhouse_url")]
    pub clickhouse_url: String,

    /// ClickHouse database name
    #[serde(default = "default_clickhouse_database")]
    pub clickhouse_database: String,

    /// ClickHouse username
    #[serde(default = "default_clickhouse_username")]
    pub clickhouse_username: String,

    /// ClickHouse password
    #[serde(default = "default_clickhouse_password")]
    pub clickhouse_password: String,

    /// Table receiving metric points
    #[serde(default = "default_metrics_table")]
    pub metrics_table: String,

    // Demo producer configuration
    /// Publish synthetic envelopes into the raw stream
    #[serde(default = "default_demo_producer_enabled")]
    pub demo_producer_enabled: bool,

    /// Demo producer publish interval in milliseconds
    #[serde(default = "default_demo_producer_interval_ms")]
    pub demo_producer_interval_ms: u64,

    /// Device id the demo producer stamps on its envelopes
    #[serde(default = "default_demo_producer_device_id")]
    pub demo_producer_device_id: String,

    /// Hop budget stamped on demo envelopes
    #[serde(default = "default_demo_producer_max_ttl")]
    pub demo_producer_max_ttl: u32,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("FLOODMESH"))
            .build()?
            .try_deserialize()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_raw_envelopes_stream() -> String {
    "raw_envelopes".to_string()
}

fn default_raw_envelopes_subject() -> String {
    "raw_envelopes.*".to_string()
}

fn default_ingest_consumer_name() -> String {
    "floodmesh-ingest".to_string()
}

fn default_nats_batch_size() -> usize {
    64
}

fn default_nats_batch_wait_secs() -> u64 {
    5
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_dedup_retention_secs() -> u64 {
    3600
}

fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_clickhouse_database() -> String {
    "floodmesh".to_string()
}

fn default_clickhouse_username() -> String {
    "floodmesh".to_string()
}

fn default_clickhouse_password() -> String {
    "floodmesh".to_string()
}

fn default_metrics_table() -> String {
    "sensor_metrics".to_string()
}

fn default_demo_producer_enabled() -> bool {
    false
}

fn default_demo_producer_interval_ms() -> u64 {
    5000
}

fn default_demo_producer_device_id() -> String {
    "demo-node-1".to_string()
}

fn default_demo_producer_max_ttl() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_environment() {
        let config: ServiceConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.raw_envelopes_stream, "raw_envelopes");
        assert_eq!(config.dedup_retention_secs, 3600);
        assert_eq!(config.metrics_table, "sensor_metrics");
        assert!(!config.demo_producer_enabled);
    }
}
