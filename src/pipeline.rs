//! End-to-end request orchestration.
//!
//! One call per inbound request: resolve the host, build the object
//! key, fetch from storage, and compose the outbound response.  All
//! proxying outcomes (200, 304, the 404 chains) are composed here; only
//! transport failures escape as [`ProxyError`].

use axum::http::header::{HeaderName, CACHE_CONTROL, CONTENT_TYPE, SERVER};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::HostConfigCache;
use crate::errors::ProxyError;
use crate::metrics;
use crate::not_found::NotFoundHandler;
use crate::object_store::{FetchedResource, ObjectFetcher};
use crate::policy;
use crate::templates::TemplateStore;
use crate::SERVER_IDENT;

/// Inbound conditional/cache headers forwarded to the origin.
const PROXY_REQUEST_HEADERS: &[&str] = &["cache-control", "if-modified-since", "if-none-match"];

/// Origin headers allowed through to the client.
const PROXY_RESPONSE_HEADERS: &[&str] = &["content-length", "last-modified", "etag"];

/// Percent-encoding set for object keys: everything but unreserved
/// characters and `/`, matching how the resolved paths are stored.
const OBJECT_KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The request-routing and origin-fetch pipeline.
pub struct ProxyPipeline {
    cache: Arc<HostConfigCache>,
    fetcher: Arc<dyn ObjectFetcher>,
    not_found: NotFoundHandler,
    templates: Arc<TemplateStore>,
    bucket: String,
}

impl ProxyPipeline {
    pub fn new(
        cache: Arc<HostConfigCache>,
        fetcher: Arc<dyn ObjectFetcher>,
        templates: Arc<TemplateStore>,
        bucket: String,
    ) -> Self {
        let not_found = NotFoundHandler::new(fetcher.clone(), templates.clone(), bucket.clone());
        Self {
            cache,
            fetcher,
            not_found,
            templates,
            bucket,
        }
    }

    /// Serve one request end to end.
    pub async fn handle(
        &self,
        hostname: &str,
        resource_path: &str,
        request_headers: &HeaderMap,
    ) -> Result<Response, ProxyError> {
        let config = self.cache.resolve(hostname).await?;

        if config.is_unknown() {
            debug!(hostname, "host not found");
            let body = self.templates.host_not_found().await?;
            return Ok(html_response(StatusCode::NOT_FOUND, body.into_bytes()));
        }
        // Checked by is_unknown above.
        let prefix = config.path.as_deref().unwrap_or_default();

        let resource = normalize_resource_path(resource_path);
        let key = build_object_key(prefix, &resource);

        let forwarded = filter_request_headers(request_headers);
        let fetched = self
            .fetcher
            .fetch(&self.bucket, &key, "GET", &forwarded, true)
            .await?;
        metrics::record_origin_fetch(fetched.status);

        match fetched.status {
            304 => Ok(not_modified_response()),
            200 => Ok(proxied_response(&fetched)),
            status => {
                debug!(hostname, key, status, "resource not found at origin");
                let outcome = self.not_found.handle(&config).await?;
                // Persisting the probe result is best-effort: the
                // response is already composed.
                if let Err(err) = self.cache.update(hostname, &outcome.config).await {
                    warn!(hostname, "failed to persist custom-404 flag: {err}");
                }
                Ok(html_response(StatusCode::NOT_FOUND, outcome.body.to_vec()))
            }
        }
    }
}

// -- Path normalization -------------------------------------------------------

/// Rewrite empty or directory paths to their index document and
/// percent-encode the result.  Idempotent with respect to the rewrite:
/// a path that already ends in `index.html` passes through unchanged.
pub fn normalize_resource_path(resource_path: &str) -> String {
    let mut path = resource_path.trim_start_matches('/').to_string();
    if path.is_empty() || path.ends_with('/') {
        path.push_str("index.html");
    }
    utf8_percent_encode(&path, OBJECT_KEY_ENCODE_SET).to_string()
}

/// Join the tenant's storage prefix with a normalized resource path.
pub fn build_object_key(prefix: &str, resource: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), resource)
}

// -- Header composition -------------------------------------------------------

/// Keep only the allow-listed conditional/cache request headers.
fn filter_request_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    PROXY_REQUEST_HEADERS
        .iter()
        .filter_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
}

/// Fixed headers present on every outbound response.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(SERVER, HeaderValue::from_static(SERVER_IDENT));
    headers
}

fn html_response(status: StatusCode, body: Vec<u8>) -> Response {
    let mut headers = default_headers();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    (status, headers, body).into_response()
}

/// Empty 304 with default headers only; no cache policy is computed.
fn not_modified_response() -> Response {
    (StatusCode::NOT_MODIFIED, default_headers()).into_response()
}

/// Compose the 200 passthrough: allow-listed origin headers, fixed
/// defaults, and the policy-driven `Cache-Control`.
fn proxied_response(fetched: &FetchedResource) -> Response {
    let mut headers = default_headers();

    for name in PROXY_RESPONSE_HEADERS {
        if let Some(value) = fetched.headers.get(*name) {
            if !value.is_empty() {
                let header = HeaderName::from_static(*name);
                headers.insert(header, value.clone());
            }
        }
    }

    let content_type = fetched.content_type().unwrap_or_default().to_string();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        if !content_type.is_empty() {
            headers.insert(CONTENT_TYPE, value);
        }
    }

    let cache_control = policy::cache_control(&content_type);
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        headers.insert(CACHE_CONTROL, value);
    }

    (StatusCode::OK, headers, fetched.body.clone()).into_response()
}
