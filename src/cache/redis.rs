//! Redis-backed config store.
//!
//! Externally persisted variant: host configs are serialized as JSON
//! (`{"path": ..., "custom_404": bool, ...extra}`) keyed by hostname,
//! with the TTL applied at write time via Redis's native expiry.  Uses
//! a multiplexed [`ConnectionManager`] shared by all in-flight
//! requests; it reconnects on its own, so no connection is opened per
//! request.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::ConfigStore;
use crate::errors::ProxyError;
use crate::resolver::HostConfig;

/// Config store over a shared Redis connection.
pub struct RedisConfigStore {
    manager: ConnectionManager,
}

impl RedisConfigStore {
    /// Connect to the Redis instance at `url`.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }

    fn backend_err(err: redis::RedisError) -> ProxyError {
        ProxyError::CacheBackend {
            message: err.to_string(),
        }
    }
}

impl ConfigStore for RedisConfigStore {
    fn get(
        &self,
        hostname: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<HostConfig>, ProxyError>> + Send + '_>> {
        let mut conn = self.manager.clone();
        let key = hostname.to_string();
        Box::pin(async move {
            let raw: Option<String> = conn.get(&key).await.map_err(Self::backend_err)?;
            match raw {
                Some(json) => {
                    let config = serde_json::from_str(&json).map_err(|e| {
                        ProxyError::CacheBackend {
                            message: format!("malformed cached config for {key}: {e}"),
                        }
                    })?;
                    Ok(Some(config))
                }
                None => Ok(None),
            }
        })
    }

    fn set(
        &self,
        hostname: &str,
        config: &HostConfig,
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), ProxyError>> + Send + '_>> {
        let mut conn = self.manager.clone();
        let key = hostname.to_string();
        let json = serde_json::to_string(config);
        // SETEX rejects a zero expiry.
        let ttl_secs = ttl.as_secs().max(1);
        Box::pin(async move {
            let json = json
                .map_err(|e| ProxyError::Internal(anyhow::anyhow!("serialize config: {e}")))?;
            conn.set_ex::<_, _, ()>(&key, json, ttl_secs)
                .await
                .map_err(Self::backend_err)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_shape_matches_wire_format() {
        let mut config = HostConfig::with_path("/proj");
        config.custom_404 = false;
        config
            .extra
            .insert("project".to_string(), serde_json::json!("demo"));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "path": "/proj",
                "custom_404": false,
                "project": "demo",
            })
        );
    }
}
