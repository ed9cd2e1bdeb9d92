use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use common::clickhouse::ClickHouseClient;
use common::domain::{DomainError, DomainResult, MetricPoint, MetricSink};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct MetricPointRow {
    pub series: String,
    pub device: String,
    pub value: f64,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    pub ingested_at: DateTime<Utc>,
}

impl From<&MetricPoint> for MetricPointRow {
    fn from(point: &MetricPoint) -> Self {
        MetricPointRow {
            series: point.series.clone(),
            device: point.device_id.clone(),
            value: point.value,
            ingested_at: point.ingested_at,
        }
    }
}

/// ClickHouse implementation of [`MetricSink`].
///
/// All points of one envelope go out as a single insert; ClickHouse applies
/// the batch without transactional rollback, which matches the sink
/// contract's best-effort batch semantics.
#[derive(Clone)]
pub struct ClickHouseMetricRepository {
    client: ClickHouseClient,
    table: String,
}

impl ClickHouseMetricRepository {
    pub fn new(client: ClickHouseClient, table: String) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl MetricSink for ClickHouseMetricRepository {
    async fn write_points(&self, points: &[MetricPoint]) -> DomainResult<()> {
        if points.is_empty() {
            debug!("no points to write, skipping");
            return Ok(());
        }

        debug!(
            point_count = points.len(),
            table = %self.table,
            "writing metric points to ClickHouse"
        );

        let rows: Vec<MetricPointRow> = points.iter().map(|point| point.into()).collect();

        let mut insert = self
            .client
            .get_client()
            .insert::<MetricPointRow>(&self.table)
            .map_err(|e| {
                error!("failed to create ClickHouse insert: {}", e);
                DomainError::MetricSink(e.into())
            })?;

        for row in &rows {
            insert.write(row).await.map_err(|e| {
                error!("failed to write row to ClickHouse: {}", e);
                DomainError::MetricSink(e.into())
            })?;
        }

        insert.end().await.map_err(|e| {
            error!("failed to finalize ClickHouse insert: {}", e);
            DomainError::MetricSink(e.into())
        })?;

        debug!(rows_inserted = rows.len(), "wrote metric points");

        Ok(())
    }
}
