//! sitegate library -- multi-tenant static-site reverse proxy.
//!
//! This crate maps an inbound request's `Host` header to a tenant
//! deployment record, proxies the requested resource from a shared
//! object-storage bucket with signed GETs, rewrites cache and
//! conditional headers, and substitutes tenant-specific or default
//! error pages on failure.

use std::sync::Arc;

pub mod cache;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod not_found;
pub mod object_store;
pub mod pipeline;
pub mod policy;
pub mod resolver;
pub mod server;
pub mod signing;
pub mod templates;

use crate::config::Config;
use crate::pipeline::ProxyPipeline;

/// Fixed `Server` response header and outbound `User-Agent` value.
pub const SERVER_IDENT: &str = concat!("sitegate/", env!("CARGO_PKG_VERSION"));

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The per-request proxy pipeline.
    pub pipeline: ProxyPipeline,
}
