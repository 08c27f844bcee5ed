//! Object-storage origin client.
//!
//! The [`ObjectFetcher`] trait is the seam between the pipeline and the
//! origin; [`S3ObjectStore`] is the production implementation, issuing
//! signed GETs over one shared, connection-pooling `reqwest` client.
//! Non-2xx statuses are not errors here: the caller branches on them.

use axum::http::HeaderMap;
use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION, HOST};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

use crate::config::StorageConfig;
use crate::errors::ProxyError;
use crate::signing;

/// The result of a storage fetch: status, headers, raw body.
/// Immutable once constructed; no interpretation of status happens here.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// HTTP status returned by the origin.
    pub status: u16,
    /// Origin response headers, unfiltered.
    pub headers: HeaderMap,
    /// Raw response body.
    pub body: Bytes,
}

impl FetchedResource {
    /// The origin's `Content-Type` header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Async origin-fetch contract.
///
/// Manual future desugaring keeps the trait object-safe so the pipeline
/// can hold an `Arc<dyn ObjectFetcher>` and tests can swap in a mock.
pub trait ObjectFetcher: Send + Sync + 'static {
    /// Fetch `object_key` from `bucket`, optionally signing the request.
    /// `extra_headers` are forwarded to the origin verbatim.
    fn fetch(
        &self,
        bucket: &str,
        object_key: &str,
        method: &str,
        extra_headers: &[(String, String)],
        signed: bool,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedResource, ProxyError>> + Send + '_>>;
}

/// Production fetcher against the configured storage domain.
pub struct S3ObjectStore {
    client: reqwest::Client,
    domain: String,
    access_key: String,
    secret_key: String,
    timeout: Duration,
}

impl S3ObjectStore {
    /// Build a fetcher over the process-wide shared client.
    pub fn new(client: reqwest::Client, storage: &StorageConfig) -> Self {
        Self {
            client,
            domain: storage.domain.clone(),
            access_key: storage.access_key.clone(),
            secret_key: storage.secret_key.clone(),
            timeout: Duration::from_secs(storage.request_timeout),
        }
    }

    async fn fetch_inner(
        &self,
        bucket: &str,
        object_key: &str,
        method: &str,
        extra_headers: &[(String, String)],
        signed: bool,
    ) -> Result<FetchedResource, ProxyError> {
        let key = object_key.trim_start_matches('/');
        let url = format!("https://{}/{}", self.domain, key);

        let http_method = method
            .parse::<reqwest::Method>()
            .map_err(|e| ProxyError::Internal(anyhow::anyhow!("bad method {method:?}: {e}")))?;

        let mut request = self
            .client
            .request(http_method, &url)
            .timeout(self.timeout)
            // Virtual-hosted addressing: the bucket rides in Host.
            .header(HOST, format!("{bucket}.{}", self.domain));

        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProxyError::Internal(anyhow::anyhow!("bad header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ProxyError::Internal(anyhow::anyhow!("bad header value: {e}")))?;
            request = request.header(name, value);
        }

        if signed {
            let amz_date = signing::amz_date_now();
            let signature = signing::sign(&self.secret_key, bucket, key, method, &amz_date);
            request = request
                .header(
                    AUTHORIZATION,
                    format!("AWS {}:{}", self.access_key, signature),
                )
                .header("x-amz-date", amz_date);
        }

        // Transport failure is the only error path; any status code is
        // a normal return value.
        let response = request.send().await.map_err(ProxyError::upstream)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ProxyError::upstream)?;

        debug!(bucket, key, status, bytes = body.len(), "origin fetch");

        Ok(FetchedResource {
            status,
            headers,
            body,
        })
    }
}

impl ObjectFetcher for S3ObjectStore {
    fn fetch(
        &self,
        bucket: &str,
        object_key: &str,
        method: &str,
        extra_headers: &[(String, String)],
        signed: bool,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedResource, ProxyError>> + Send + '_>> {
        let bucket = bucket.to_string();
        let object_key = object_key.to_string();
        let method = method.to_string();
        let extra_headers = extra_headers.to_vec();
        Box::pin(async move {
            self.fetch_inner(&bucket, &object_key, &method, &extra_headers, signed)
                .await
        })
    }
}
