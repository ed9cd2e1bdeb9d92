use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::domain::{DedupStore, DomainResult, Envelope, EnvelopeError, MetricPoint, MetricSink};
use tracing::{debug, error, info};

use crate::domain::counters::IngestCounters;

/// Sentinel stored under a message id once it has been ingested.
const PROCESSED_SENTINEL: &str = "PROCESSED";

/// Result of processing one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Bytes did not parse as the envelope encoding.
    InvalidEncoding,
    /// Parsed, but a required field is missing or ill-typed.
    InvalidSchema,
    /// This message id was already ingested within the retention window.
    Duplicate,
}

/// The deduplicating ingestion gateway.
///
/// Turns a raw inbound message into a validated, deduplicated write:
/// decode, validate, dedup-gate, then one time-series point per field.
/// The dedup mark happens before the sink write; a crash between the two
/// loses that reading rather than ever writing it twice.
///
/// The service never retries internally. A transient store or sink failure
/// surfaces as an `Err`, and upstream redelivery is the retry mechanism.
pub struct IngestionService {
    dedup_store: Arc<dyn DedupStore>,
    metric_sink: Arc<dyn MetricSink>,
    retention: Duration,
    counters: Arc<IngestCounters>,
}

impl IngestionService {
    pub fn new(
        dedup_store: Arc<dyn DedupStore>,
        metric_sink: Arc<dyn MetricSink>,
        retention: Duration,
    ) -> Self {
        Self {
            dedup_store,
            metric_sink,
            retention,
            counters: Arc::new(IngestCounters::new()),
        }
    }

    pub fn counters(&self) -> Arc<IngestCounters> {
        Arc::clone(&self.counters)
    }

    /// Process one raw inbound message.
    ///
    /// `Ok(Rejected(_))` outcomes are terminal: redelivering the same bytes
    /// cannot change them. `Err` means a dependency was unavailable and the
    /// message should be redelivered.
    pub async fn process(&self, raw: &[u8]) -> DomainResult<IngestOutcome> {
        // 1-2. Decode and validate
        let envelope = match Envelope::decode(raw) {
            Ok(envelope) => envelope,
            Err(EnvelopeError::Encoding(reason)) => {
                error!(reason = %reason, "rejecting message with invalid encoding");
                self.counters.record_invalid_encoding();
                return Ok(IngestOutcome::Rejected(RejectReason::InvalidEncoding));
            }
            Err(EnvelopeError::Schema(reason)) => {
                error!(reason = %reason, "rejecting envelope with invalid schema");
                self.counters.record_invalid_schema();
                return Ok(IngestOutcome::Rejected(RejectReason::InvalidSchema));
            }
        };

        // 3. Cheap pre-check; flooding makes duplicates the common case
        if self.dedup_store.exists(&envelope.message_id).await? {
            debug!(
                message_id = %envelope.message_id,
                "duplicate envelope, already ingested"
            );
            self.counters.record_duplicate();
            return Ok(IngestOutcome::Rejected(RejectReason::Duplicate));
        }

        // 4. Atomic mark; losing the race means a concurrent delivery won
        let inserted = self
            .dedup_store
            .set_if_absent(&envelope.message_id, PROCESSED_SENTINEL, self.retention)
            .await?;
        if !inserted {
            debug!(
                message_id = %envelope.message_id,
                "duplicate envelope, lost the ingestion race"
            );
            self.counters.record_duplicate();
            return Ok(IngestOutcome::Rejected(RejectReason::Duplicate));
        }

        // 5. One point per field, written synchronously as one batch
        let ingested_at = Utc::now();
        let points: Vec<MetricPoint> = envelope
            .values
            .iter()
            .map(|(field, value)| MetricPoint {
                series: field.clone(),
                device_id: envelope.device_id.clone(),
                value: *value,
                ingested_at,
            })
            .collect();

        if let Err(e) = self.metric_sink.write_points(&points).await {
            self.counters.record_sink_failure();
            return Err(e);
        }

        self.counters.record_accepted();
        info!(
            device_id = %envelope.device_id,
            message_id = %envelope.message_id,
            point_count = points.len(),
            "ingested envelope"
        );

        Ok(IngestOutcome::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use common::domain::{DomainError, MockDedupStore, MockMetricSink};

    const RETENTION: Duration = Duration::from_secs(3600);

    fn wire() -> &'static [u8] {
        br#"{"d_id":"A","m_id":"m1","ttl":2,"values":{"temperature":21.5,"humidity":40}}"#
    }

    #[tokio::test]
    async fn test_first_delivery_is_accepted_with_one_point_per_field() {
        // Arrange
        let mut dedup = MockDedupStore::new();
        dedup
            .expect_exists()
            .withf(|key: &str| key == "m1")
            .times(1)
            .returning(|_| Ok(false));
        dedup
            .expect_set_if_absent()
            .withf(|key: &str, value: &str, ttl: &Duration| {
                key == "m1" && value == "PROCESSED" && *ttl == RETENTION
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut sink = MockMetricSink::new();
        sink.expect_write_points()
            .withf(|points: &[MetricPoint]| {
                points.len() == 2
                    && points.iter().all(|p| p.device_id == "A")
                    && points
                        .iter()
                        .any(|p| p.series == "temperature" && p.value == 21.5)
                    && points
                        .iter()
                        .any(|p| p.series == "humidity" && p.value == 40.0)
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = IngestionService::new(Arc::new(dedup), Arc::new(sink), RETENTION);

        // Act
        let outcome = service.process(wire()).await.unwrap();

        // Assert
        assert_eq!(outcome, IngestOutcome::Accepted);
        assert_eq!(service.counters().snapshot().accepted, 1);
    }

    #[tokio::test]
    async fn test_known_message_id_is_rejected_without_side_effects() {
        // Arrange
        let mut dedup = MockDedupStore::new();
        dedup.expect_exists().times(1).returning(|_| Ok(true));
        dedup.expect_set_if_absent().times(0);

        let mut sink = MockMetricSink::new();
        sink.expect_write_points().times(0);

        let service = IngestionService::new(Arc::new(dedup), Arc::new(sink), RETENTION);

        // Act
        let outcome = service.process(wire()).await.unwrap();

        // Assert
        assert_eq!(outcome, IngestOutcome::Rejected(RejectReason::Duplicate));
        assert_eq!(service.counters().snapshot().duplicate, 1);
    }

    #[tokio::test]
    async fn test_losing_the_mark_race_is_a_duplicate() {
        // Arrange: pre-check misses, then the conditional insert loses
        let mut dedup = MockDedupStore::new();
        dedup.expect_exists().times(1).returning(|_| Ok(false));
        dedup
            .expect_set_if_absent()
            .times(1)
            .returning(|_, _, _| Ok(false));

        let mut sink = MockMetricSink::new();
        sink.expect_write_points().times(0);

        let service = IngestionService::new(Arc::new(dedup), Arc::new(sink), RETENTION);

        // Act
        let outcome = service.process(wire()).await.unwrap();

        // Assert
        assert_eq!(outcome, IngestOutcome::Rejected(RejectReason::Duplicate));
    }

    #[tokio::test]
    async fn test_invalid_encoding_touches_nothing() {
        // Arrange
        let mut dedup = MockDedupStore::new();
        dedup.expect_exists().times(0);
        dedup.expect_set_if_absent().times(0);
        let mut sink = MockMetricSink::new();
        sink.expect_write_points().times(0);

        let service = IngestionService::new(Arc::new(dedup), Arc::new(sink), RETENTION);

        // Act
        let outcome = service.process(b"\x00\x01garbage").await.unwrap();

        // Assert
        assert_eq!(
            outcome,
            IngestOutcome::Rejected(RejectReason::InvalidEncoding)
        );
        assert_eq!(service.counters().snapshot().invalid_encoding, 1);
    }

    #[tokio::test]
    async fn test_schema_violations_touch_nothing() {
        let cases: [&[u8]; 4] = [
            br#"{"m_id":"m1","ttl":2,"values":{"t":1.0}}"#,
            br#"{"d_id":"A","ttl":2,"values":{"t":1.0}}"#,
            br#"{"d_id":"A","m_id":"m1","values":{"t":1.0}}"#,
            br#"{"d_id":"A","m_id":"m1","ttl":2}"#,
        ];

        for raw in cases {
            let mut dedup = MockDedupStore::new();
            dedup.expect_exists().times(0);
            dedup.expect_set_if_absent().times(0);
            let mut sink = MockMetricSink::new();
            sink.expect_write_points().times(0);

            let service = IngestionService::new(Arc::new(dedup), Arc::new(sink), RETENTION);

            let outcome = service.process(raw).await.unwrap();

            assert_eq!(
                outcome,
                IngestOutcome::Rejected(RejectReason::InvalidSchema),
                "case {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[tokio::test]
    async fn test_sink_failure_surfaces_as_transient_error() {
        // Arrange
        let mut dedup = MockDedupStore::new();
        dedup.expect_exists().times(1).returning(|_| Ok(false));
        dedup
            .expect_set_if_absent()
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut sink = MockMetricSink::new();
        sink.expect_write_points()
            .times(1)
            .returning(|_| Err(DomainError::MetricSink(anyhow!("sink unreachable"))));

        let service = IngestionService::new(Arc::new(dedup), Arc::new(sink), RETENTION);

        // Act
        let result = service.process(wire()).await;

        // Assert
        assert!(matches!(result, Err(DomainError::MetricSink(_))));
        assert_eq!(service.counters().snapshot().sink_failures, 1);
    }

    #[tokio::test]
    async fn test_dedup_store_failure_surfaces_as_transient_error() {
        // Arrange
        let mut dedup = MockDedupStore::new();
        dedup
            .expect_exists()
            .times(1)
            .returning(|_| Err(DomainError::DedupStore(anyhow!("store unreachable"))));
        let mut sink = MockMetricSink::new();
        sink.expect_write_points().times(0);

        let service = IngestionService::new(Arc::new(dedup), Arc::new(sink), RETENTION);

        // Act
        let result = service.process(wire()).await;

        // Assert
        assert!(matches!(result, Err(DomainError::DedupStore(_))));
    }
}
