//! Hostname-to-deployment resolution.
//!
//! A [`Resolver`] turns the inbound `Host` header into a [`HostConfig`]
//! describing the tenant currently bound to that hostname.  Two
//! interchangeable backends exist, selected at composition time:
//! [`api::ApiResolver`] (deployments API lookup) and
//! [`database::DatabaseResolver`] (relational lookup over
//! build/deploy/environment rows).

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

use crate::errors::ProxyError;

pub mod api;
pub mod database;

/// The deployment record bound to a hostname.
///
/// `path` is the storage-key prefix for the tenant's assets; `None` or
/// empty means "host unknown".  `custom_404` starts true and is flipped
/// to false once a probe confirms the tenant ships no custom 404 page.
/// Extra fields returned by the API resolver are carried opaquely so
/// the persisted-cache representation round-trips them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Storage-key prefix for this tenant's assets.
    #[serde(default)]
    pub path: Option<String>,

    /// Whether a custom `404.html` object should still be probed.
    #[serde(default = "default_custom_404")]
    pub custom_404: bool,

    /// Opaque passthrough fields from the resolver backend.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_custom_404() -> bool {
    true
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::unknown()
    }
}

impl HostConfig {
    /// The sentinel "host unknown" config.
    pub fn unknown() -> Self {
        Self {
            path: None,
            custom_404: true,
            extra: serde_json::Map::new(),
        }
    }

    /// A config with the given storage path prefix.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            custom_404: true,
            extra: serde_json::Map::new(),
        }
    }

    /// True when no deployment is bound to the hostname.
    pub fn is_unknown(&self) -> bool {
        self.path.as_deref().map_or(true, str::is_empty)
    }
}

/// Async hostname resolution contract.
///
/// `Ok(None)` means "no deployment found" and is not an error; only
/// transport failures against the backing service surface as `Err`.
pub trait Resolver: Send + Sync + 'static {
    /// Resolve `hostname` to its current deployment config.
    fn resolve(
        &self,
        hostname: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<HostConfig>, ProxyError>> + Send + '_>>;
}
