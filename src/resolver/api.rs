//! Deployments-API resolver backend.
//!
//! Queries `GET {base}/v1/domains/?domain={hostname}` with a token in
//! the `Authorization` header.  A 200 response body is JSON merged into
//! the [`HostConfig`]; any non-200 status means "no config found".
//! Transport failures map to [`ProxyError::UpstreamUnavailable`].

use reqwest::header::{AUTHORIZATION, USER_AGENT};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

use super::{HostConfig, Resolver};
use crate::config::ApiResolverConfig;
use crate::errors::ProxyError;
use crate::SERVER_IDENT;

/// Resolver backed by the external deployments API.
pub struct ApiResolver {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl ApiResolver {
    /// Build a resolver over the process-wide shared client.
    pub fn new(client: reqwest::Client, config: &ApiResolverConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.request_timeout),
        }
    }

    async fn resolve_inner(&self, hostname: &str) -> Result<Option<HostConfig>, ProxyError> {
        let url = format!("{}/v1/domains/", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .query(&[("domain", hostname)])
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .header(USER_AGENT, SERVER_IDENT)
            .send()
            .await
            .map_err(ProxyError::upstream)?;

        if response.status() != reqwest::StatusCode::OK {
            debug!(hostname, status = %response.status(), "no deployment found via API");
            return Ok(None);
        }

        let config: HostConfig = response.json().await.map_err(ProxyError::upstream)?;
        debug!(hostname, path = ?config.path, "resolved via API");
        Ok(Some(config))
    }
}

impl Resolver for ApiResolver {
    fn resolve(
        &self,
        hostname: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<HostConfig>, ProxyError>> + Send + '_>> {
        let hostname = hostname.to_string();
        Box::pin(async move { self.resolve_inner(&hostname).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = reqwest::Client::new();
        let resolver = ApiResolver::new(
            client,
            &ApiResolverConfig {
                base_url: "https://api.example.com/".to_string(),
                api_key: "k".to_string(),
                request_timeout: 5,
            },
        );
        assert_eq!(resolver.base_url, "https://api.example.com");
    }

    #[test]
    fn api_body_merges_into_host_config() {
        // The API returns `path` plus arbitrary deployment fields; all
        // must survive into the config.
        let body = r#"{"path":"/site","project":"demo","deployed_at":"2026-08-01T00:00:00Z"}"#;
        let config: HostConfig = serde_json::from_str(body).unwrap();
        assert_eq!(config.path.as_deref(), Some("/site"));
        assert!(config.custom_404);
        assert_eq!(config.extra["project"], "demo");
    }
}
