use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::domain::{DedupStore, DomainError, DomainResult};

/// Redis-backed [`DedupStore`].
///
/// `set_if_absent` maps to `SET key value NX EX seconds`, so the duplicate
/// check and the mark are one server-side operation; concurrent gateways
/// racing on a message id see exactly one successful insert. Expiry is
/// enforced by the server.
#[derive(Clone)]
pub struct RedisDedupStore {
    connection: ConnectionManager,
}

impl RedisDedupStore {
    pub async fn connect(url: &str) -> Result<Self> {
        info!(url = %url, "connecting to Redis");

        let client = redis::Client::open(url).context("invalid Redis URL")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;

        info!("connected to Redis");
        Ok(Self { connection })
    }

    /// Redis rejects `EX 0`; a sub-second retention rounds up to 1s.
    fn ttl_seconds(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[async_trait]
impl DedupStore for RedisDedupStore {
    async fn exists(&self, key: &str) -> DomainResult<bool> {
        let mut connection = self.connection.clone();
        let present: bool = connection
            .exists(key)
            .await
            .map_err(|e| DomainError::DedupStore(e.into()))?;
        Ok(present)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<()> {
        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(key, value, Self::ttl_seconds(ttl))
            .await
            .map_err(|e| DomainError::DedupStore(e.into()))?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<bool> {
        let mut connection = self.connection.clone();
        // SET NX EX replies OK on insert and nil when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(Self::ttl_seconds(ttl))
            .query_async(&mut connection)
            .await
            .map_err(|e| DomainError::DedupStore(e.into()))?;
        Ok(reply.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Store behavior against a live server is covered by deployments and the
    // in-memory implementation's tests; here we only pin the TTL rounding.
    #[test]
    fn test_ttl_rounds_up_to_one_second() {
        assert_eq!(RedisDedupStore::ttl_seconds(Duration::from_millis(200)), 1);
        assert_eq!(RedisDedupStore::ttl_seconds(Duration::from_secs(0)), 1);
        assert_eq!(
            RedisDedupStore::ttl_seconds(Duration::from_secs(3600)),
            3600
        );
    }
}
