use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::error::DomainResult;

/// One time-series point produced from a single `(field, value)` pair of an
/// accepted envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    /// Series name; the envelope field name.
    pub series: String,
    /// Originating node, carried as the `device` tag.
    pub device_id: String,
    pub value: f64,
    /// Stamped when the gateway accepts the envelope.
    pub ingested_at: DateTime<Utc>,
}

/// Durable per-field time-series store.
///
/// Writes are synchronous from the gateway's perspective: `write_points`
/// returns only after the store has accepted or refused the batch. Points of
/// one envelope form a single best-effort batch; partial persistence on
/// failure is acceptable and never rolled back.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn write_points(&self, points: &[MetricPoint]) -> DomainResult<()>;
}
