//! Custom/default 404 fallback chain.
//!
//! When a tenant resource is missing, the handler first probes the
//! tenant's own `404.html` object (skipped once a previous probe has
//! confirmed its absence), then falls back to the fixed default page.
//! The handler returns the updated [`HostConfig`] by value; the caller
//! persists it back into the cache, so no shared entry is mutated in
//! place.

use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use crate::errors::ProxyError;
use crate::object_store::ObjectFetcher;
use crate::resolver::HostConfig;
use crate::templates::TemplateStore;

/// The composed 404 body plus the config to persist.
pub struct NotFoundOutcome {
    /// Page body, always served as `text/html` with status 404.
    pub body: Bytes,
    /// Config with the probe result recorded in `custom_404`.
    pub config: HostConfig,
}

/// Composes the tenant-custom-404-or-default-404 response.
pub struct NotFoundHandler {
    fetcher: Arc<dyn ObjectFetcher>,
    templates: Arc<TemplateStore>,
    bucket: String,
}

impl NotFoundHandler {
    pub fn new(
        fetcher: Arc<dyn ObjectFetcher>,
        templates: Arc<TemplateStore>,
        bucket: String,
    ) -> Self {
        Self {
            fetcher,
            templates,
            bucket,
        }
    }

    /// Build the 404 response body for a tenant.
    ///
    /// Transport failure during the probe propagates; a non-200 probe
    /// just records the absence and falls through to the default page.
    pub async fn handle(&self, config: &HostConfig) -> Result<NotFoundOutcome, ProxyError> {
        let mut config = config.clone();

        if config.custom_404 {
            let prefix = config.path.as_deref().unwrap_or("");
            let key = format!("{}/404.html", prefix.trim_end_matches('/'));
            let resource = self
                .fetcher
                .fetch(&self.bucket, &key, "GET", &[], true)
                .await?;

            let has_custom = resource.status == 200;
            config.custom_404 = has_custom;

            if has_custom {
                debug!(key, "serving tenant custom 404");
                return Ok(NotFoundOutcome {
                    body: resource.body,
                    config,
                });
            }
            debug!(key, status = resource.status, "no custom 404 object");
        }

        let body = self.templates.file_not_found().await?;
        Ok(NotFoundOutcome {
            body: Bytes::from(body),
            config,
        })
    }
}
