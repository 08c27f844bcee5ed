//! Axum router construction.
//!
//! Tenant traffic is a single wildcard GET route; the `Host` header
//! selects the tenant inside the handler.  `/health` and `/metrics`
//! are infrastructure endpoints and take precedence over the wildcard.

use axum::{
    extract::{Path, State},
    http::{header::HOST, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::errors::ProxyError;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::{AppState, SERVER_IDENT};

/// Build the axum [`Router`] for the proxy.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    if state.config.observability.health_check {
        router = router.route("/health", get(health_check));
    }
    if state.config.observability.metrics {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        // Tenant surface: GET only, any path.
        .route("/", get(handle_root))
        .route("/*resource_path", get(handle_resource))
        .with_state(state)
        .layer(middleware::from_fn(common_headers_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}

// -- Common headers middleware -----------------------------------------------

/// Stamp the fixed `Server` identifier on every response that does not
/// already carry one (the pipeline sets it on composed responses).
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    if !headers.contains_key("server") {
        headers.insert("server", HeaderValue::from_static(SERVER_IDENT));
    }
    response
}

// -- Handlers ----------------------------------------------------------------

/// `GET /` -- the tenant's index document.
async fn handle_root(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    proxy(state, String::new(), headers).await
}

/// `GET /*resource_path` -- any tenant resource.
async fn handle_resource(
    State(state): State<Arc<AppState>>,
    Path(resource_path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    proxy(state, resource_path, headers).await
}

async fn proxy(
    state: Arc<AppState>,
    resource_path: String,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let hostname = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    state.pipeline.handle(hostname, &resource_path, &headers).await
}

// -- Health check ------------------------------------------------------------

/// `GET /health` -- Returns `{"status": "ok"}` with 200 OK.
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "application/json")],
        r#"{"status":"ok"}"#,
    )
}
