/// Redis-backed key-value store, alert channel and scan progress
use crate::error::MonitorResult;
use crate::models::Alert;
use async_trait::async_trait;
use compound_governance::{GovernanceError, KeyValueStore};
use redis::{aio::ConnectionManager, AsyncCommands, RedisError};

/// Key of the last scanned block
const LAST_BLOCK_KEY: &str = "latest_block";

/// Redis store shared by the scanner and the governance automation
#[derive(Clone)]
pub struct RedisStore {
    client: ConnectionManager,
    key_prefix: String,
}

impl RedisStore {
    /// Connect to Redis
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection URL
    /// * `key_prefix` - Namespace prepended to every key
    pub async fn new(redis_url: &str, key_prefix: &str) -> MonitorResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection_manager = ConnectionManager::new(client).await?;

        Ok(Self {
            client: connection_manager,
            key_prefix: key_prefix.to_string(),
        })
    }

    /// Namespaced key
    fn key(&self, key: &str) -> String {
        namespaced(&self.key_prefix, key)
    }

    /// Read a raw string value
    pub async fn get_string(&self, key: &str) -> MonitorResult<Option<String>> {
        let mut conn = self.client.clone();
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    /// Write a raw string value
    pub async fn set_string(&self, key: &str, value: &str) -> MonitorResult<()> {
        let mut conn = self.client.clone();
        conn.set::<_, _, ()>(self.key(key), value).await?;
        Ok(())
    }

    /// Store last scanned block
    pub async fn set_last_block(&self, block_number: u64) -> MonitorResult<()> {
        let mut conn = self.client.clone();
        conn.set::<_, _, ()>(self.key(LAST_BLOCK_KEY), block_number)
            .await?;
        Ok(())
    }

    /// Last scanned block, if any
    pub async fn get_last_block(&self) -> MonitorResult<Option<u64>> {
        let mut conn = self.client.clone();
        let block: Option<u64> = conn.get(self.key(LAST_BLOCK_KEY)).await?;
        Ok(block)
    }

    /// Publish an alert on a Redis channel
    pub async fn publish_alert(&self, channel: &str, alert: &Alert) -> MonitorResult<()> {
        let json = serde_json::to_string(alert)?;
        let mut conn = self.client.clone();
        conn.publish::<_, _, ()>(channel, json).await?;
        Ok(())
    }

    /// Check if the connection is alive
    pub async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        let result: Result<Option<String>, RedisError> = conn.get(self.key("health_check")).await;
        result.is_ok()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> compound_governance::Result<Option<String>> {
        self.get_string(key)
            .await
            .map_err(|e| GovernanceError::Store(e.to_string()))
    }

    async fn put(&self, key: &str, value: &str) -> compound_governance::Result<()> {
        self.set_string(key, value)
            .await
            .map_err(|e| GovernanceError::Store(e.to_string()))
    }
}

fn namespaced(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_keys() {
        assert_eq!(namespaced("compound", "ignoredProposals"), "compound:ignoredProposals");
        assert_eq!(
            namespaced("compound", "proposalAction:queue:110"),
            "compound:proposalAction:queue:110"
        );
        assert_eq!(namespaced("", "latest_block"), "latest_block");
    }
}
