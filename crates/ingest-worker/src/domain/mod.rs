pub mod counters;
pub mod ingest_service;

pub use counters::{CounterSnapshot, IngestCounters};
pub use ingest_service::{IngestOutcome, IngestionService, RejectReason};
