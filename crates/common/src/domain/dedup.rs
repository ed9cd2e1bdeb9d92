use std::time::Duration;

use async_trait::async_trait;

use crate::domain::error::DomainResult;

/// Bounded-retention key-value store used as the at-most-once ingestion gate.
///
/// Keys are message ids, values are opaque sentinels. Expiry is time-based
/// and implicit; there is no deletion API. Implementations can be in-memory
/// or Redis-backed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Whether a live (unexpired) record exists for this key.
    async fn exists(&self, key: &str) -> DomainResult<bool>;

    /// Store a record, replacing any existing one, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<()>;

    /// Store a record only if no live record exists for this key.
    ///
    /// Returns `true` when the record was inserted, `false` when a live
    /// record was already present. The check and the insert are a single
    /// atomic operation; concurrent callers racing on one key see exactly
    /// one `true`.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<bool>;
}
