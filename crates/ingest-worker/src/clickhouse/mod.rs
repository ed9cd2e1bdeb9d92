pub mod metric_repository;

pub use metric_repository::{ClickHouseMetricRepository, MetricPointRow};
