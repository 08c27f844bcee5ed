//! Configuration loading and types for sitegate.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Each subsection governs a different part of the
//! system: networking, object storage credentials, the host resolver,
//! the host-config cache, fallback templates, and observability.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Object-storage origin settings (bucket, domain, credentials).
    #[serde(default)]
    pub storage: StorageConfig,

    /// Host resolver settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Host-config cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fallback template settings.
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings (metrics + health probes).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Object-storage origin configuration.
///
/// Objects are fetched from `https://{domain}/{key}` with a
/// virtual-hosted `Host: {bucket}.{domain}` header, signed with the
/// legacy HMAC-SHA1 scheme using `access_key` / `secret_key`.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Shared bucket holding every tenant's assets.
    #[serde(default)]
    pub bucket: String,

    /// Storage endpoint domain.
    #[serde(default = "default_storage_domain")]
    pub domain: String,

    /// Access key used in the `Authorization: AWS` header.
    #[serde(default)]
    pub access_key: String,

    /// Secret key used to sign requests.
    #[serde(default)]
    pub secret_key: String,

    /// Per-request timeout for origin fetches, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            domain: default_storage_domain(),
            access_key: String::new(),
            secret_key: String::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Host resolver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Backend type: `api` or `database`.
    #[serde(default = "default_resolver_backend")]
    pub backend: String,

    /// API-backed resolver configuration.
    #[serde(default)]
    pub api: ApiResolverConfig,

    /// Database-backed resolver configuration.
    #[serde(default)]
    pub database: DatabaseResolverConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            backend: default_resolver_backend(),
            api: ApiResolverConfig::default(),
            database: DatabaseResolverConfig::default(),
        }
    }
}

/// API-backed resolver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResolverConfig {
    /// Base URL of the deployments API.
    #[serde(default)]
    pub base_url: String,

    /// Token sent in the `Authorization` header.
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout for resolver lookups, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for ApiResolverConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Database-backed resolver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseResolverConfig {
    /// Path to the SQLite database holding build/deploy/environment rows.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseResolverConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Host-config cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Backend type: `memory` or `redis`.
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// Entry time-to-live in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl: u64,

    /// Whether "host unknown" resolver results are cached as sentinel
    /// entries.  When false, unknown hosts bypass the cache entirely.
    #[serde(default = "default_true")]
    pub negative_caching: bool,

    /// Memory store configuration.
    #[serde(default)]
    pub memory: MemoryCacheConfig,

    /// Redis store configuration.
    #[serde(default)]
    pub redis: Option<RedisCacheConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            ttl: default_cache_ttl(),
            negative_caching: true,
            memory: MemoryCacheConfig::default(),
            redis: None,
        }
    }
}

/// In-process bounded cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of cached host configs.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

/// Redis-backed cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisCacheConfig {
    /// Redis connection URL, e.g. `redis://127.0.0.1:6379/0`.
    pub url: String,
}

/// Fallback template configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    /// Directory containing the fixed 404 templates.
    #[serde(default = "default_templates_dir")]
    pub dir: String,

    /// Timeout for a single template read, in seconds.
    #[serde(default = "default_template_timeout")]
    pub read_timeout: u64,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
            read_timeout: default_template_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
///
/// Controls Prometheus metrics collection and the health probe.  Both
/// are enabled by default.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and the `/metrics` endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,

    /// Enable the `/health` probe.
    #[serde(default = "default_true")]
    pub health_check: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics: true,
            health_check: true,
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_storage_domain() -> String {
    "s3.amazonaws.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_resolver_backend() -> String {
    "api".to_string()
}

fn default_database_path() -> String {
    "./data/deployments.db".to_string()
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_cache_ttl() -> u64 {
    120
}

fn default_cache_capacity() -> usize {
    128
}

fn default_templates_dir() -> String {
    "./templates".to_string()
}

fn default_template_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}
