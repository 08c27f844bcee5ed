//! Proxy error types.
//!
//! Only transport-level failures ever escape the pipeline as errors;
//! 404 and 304 outcomes are normal responses composed inside it.  The
//! enum implements [`axum::response::IntoResponse`] so handlers can
//! simply return `Err(ProxyError::UpstreamUnavailable { .. })` and the
//! boundary layer maps it to a generic failure response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::SERVER_IDENT;

/// Errors surfaced by the proxy core.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The resolver or storage origin was unreachable or timed out.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable { message: String },

    /// The host-config cache backend failed a read.
    #[error("cache backend error: {message}")]
    CacheBackend { message: String },

    /// A fixed fallback template could not be read.
    #[error("template read failed: {message}")]
    Template { message: String },

    /// Catch-all for unexpected internal errors.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ProxyError {
    /// Build an [`UpstreamUnavailable`](ProxyError::UpstreamUnavailable)
    /// from a transport error.
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        ProxyError::UpstreamUnavailable {
            message: err.to_string(),
        }
    }

    /// Return the HTTP status this error maps to at the boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::CacheBackend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Template { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(status = %status, "request failed: {}", self);

        let body = match status {
            StatusCode::BAD_GATEWAY => "<html><body><h1>502 Bad Gateway</h1></body></html>",
            _ => "<html><body><h1>500 Internal Server Error</h1></body></html>",
        };

        (
            status,
            [
                ("content-type", "text/html; charset=utf-8".to_string()),
                ("server", SERVER_IDENT.to_string()),
            ],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_maps_to_bad_gateway() {
        let err = ProxyError::upstream("connection refused");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_maps_to_500() {
        let err = ProxyError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_carries_server_header() {
        let resp = ProxyError::upstream("timed out").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            resp.headers().get("server").unwrap().to_str().unwrap(),
            SERVER_IDENT
        );
    }
}
