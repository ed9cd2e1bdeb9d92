use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals of gateway outcomes.
///
/// Duplicates are an expected, frequent product of flooding; they are
/// counted here rather than alarmed on.
#[derive(Debug, Default)]
pub struct IngestCounters {
    accepted: AtomicU64,
    duplicate: AtomicU64,
    invalid_encoding: AtomicU64,
    invalid_schema: AtomicU64,
    sink_failures: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub accepted: u64,
    pub duplicate: u64,
    pub invalid_encoding: u64,
    pub invalid_schema: u64,
    pub sink_failures: u64,
}

impl IngestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_encoding(&self) {
        self.invalid_encoding.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_schema(&self) {
        self.invalid_schema.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            invalid_encoding: self.invalid_encoding.load(Ordering::Relaxed),
            invalid_schema: self.invalid_schema.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}
