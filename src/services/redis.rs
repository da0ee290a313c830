//! Redis cache service
//!
//! Mirrors resolved capability sets so several server instances share one
//! cache. Every key carries the configured prefix and a TTL.

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RedisConfig;
use crate::models::AppRole;
use crate::utils::errors::Result;

#[derive(Clone, Debug)]
pub struct RedisService {
    client: Client,
    prefix: String,
    ttl_seconds: u64,
}

/// Cached value together with when it was written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RedisService {
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;

        Ok(Self {
            client,
            prefix: config.prefix.clone(),
            ttl_seconds: config.ttl_seconds,
        })
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Set a value with the configured TTL
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let entry = CacheEntry {
            data: value,
            created_at: chrono::Utc::now(),
        };
        let serialized = serde_json::to_string(&entry)?;
        let full_key = self.full_key(key);

        let _: () = conn.set_ex(&full_key, serialized, self.ttl_seconds).await?;

        debug!(key = %full_key, ttl = self.ttl_seconds, "Value set in Redis");
        Ok(())
    }

    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut conn = self.get_connection().await?;
        let full_key = self.full_key(key);

        let raw: Option<String> = conn.get(&full_key).await?;
        match raw {
            Some(data) => {
                let entry = serde_json::from_str::<CacheEntry<T>>(&data)?;
                debug!(key = %full_key, "Cache hit in Redis");
                Ok(Some(entry.data))
            }
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let full_key = self.full_key(key);

        let deleted: i32 = conn.del(&full_key).await?;

        debug!(key = %full_key, deleted = deleted > 0, "Key deletion attempted");
        Ok(deleted > 0)
    }

    pub async fn cache_capabilities(&self, user_id: Uuid, roles: &[AppRole]) -> Result<()> {
        self.set(&capability_key(user_id), &roles).await
    }

    pub async fn get_capabilities(&self, user_id: Uuid) -> Result<Option<Vec<AppRole>>> {
        self.get(&capability_key(user_id)).await
    }

    pub async fn invalidate_capabilities(&self, user_id: Uuid) -> Result<bool> {
        self.delete(&capability_key(user_id)).await
    }

    /// Health check for the Redis connection
    pub async fn health_check(&self) -> bool {
        match self.get_connection().await {
            Ok(mut conn) => {
                let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
                match result {
                    Ok(response) => response == "PONG",
                    Err(e) => {
                        warn!(error = %e, "Redis health check failed");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Redis connection failed");
                false
            }
        }
    }
}

fn capability_key(user_id: Uuid) -> String {
    format!("capabilities:{}", user_id)
}
