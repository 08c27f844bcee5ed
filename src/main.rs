//! sitegate -- multi-tenant static-site reverse proxy.
//!
//! `main` is the composition root: the shared outbound HTTP client,
//! the resolver, the host-config cache and the pipeline are constructed
//! here and injected explicitly -- no ambient global state.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use sitegate::cache::{memory::MemoryConfigStore, redis::RedisConfigStore};
use sitegate::cache::{ConfigStore, HostConfigCache, MissPolicy};
use sitegate::object_store::S3ObjectStore;
use sitegate::pipeline::ProxyPipeline;
use sitegate::resolver::{api::ApiResolver, database::DatabaseResolver, Resolver};
use sitegate::templates::TemplateStore;

/// Command-line arguments for the sitegate server.
#[derive(Parser, Debug)]
#[command(
    name = "sitegate",
    version,
    about = "Multi-tenant static-site reverse proxy"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "sitegate.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing / logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Loading configuration from {}", cli.config);
    let config = sitegate::config::load_config(&cli.config)?;

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    if config.observability.metrics {
        sitegate::metrics::init_metrics();
        sitegate::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    // One long-lived, connection-pooling client for every outbound call
    // (storage origin and API resolver).
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.storage.request_timeout))
        .build()?;

    let resolver: Arc<dyn Resolver> = match config.resolver.backend.as_str() {
        "database" => {
            let resolver = DatabaseResolver::new(&config.resolver.database.path)?;
            info!(
                "Database resolver initialized at {}",
                config.resolver.database.path
            );
            Arc::new(resolver)
        }
        "api" | _ => {
            let resolver = ApiResolver::new(http_client.clone(), &config.resolver.api);
            info!("API resolver initialized at {}", config.resolver.api.base_url);
            Arc::new(resolver)
        }
    };

    let store: Arc<dyn ConfigStore> = match config.cache.backend.as_str() {
        "redis" => {
            let redis_config = config.cache.redis.as_ref().ok_or_else(|| {
                anyhow::anyhow!("cache.backend is 'redis' but cache.redis config section is missing")
            })?;
            let store = RedisConfigStore::connect(&redis_config.url).await?;
            info!("Redis host-config store connected");
            Arc::new(store)
        }
        "memory" | _ => {
            let store = MemoryConfigStore::new(config.cache.memory.capacity);
            info!(
                "In-memory host-config store initialized (capacity {})",
                config.cache.memory.capacity
            );
            Arc::new(store)
        }
    };

    let miss_policy = if config.cache.negative_caching {
        MissPolicy::CacheUnknown
    } else {
        MissPolicy::Bypass
    };
    let cache = Arc::new(HostConfigCache::new(
        store,
        resolver,
        Duration::from_secs(config.cache.ttl),
        miss_policy,
    ));

    let fetcher = Arc::new(S3ObjectStore::new(http_client, &config.storage));
    let templates = Arc::new(TemplateStore::new(&config.templates));

    let pipeline = ProxyPipeline::new(
        cache,
        fetcher,
        templates,
        config.storage.bucket.clone(),
    );

    let state = Arc::new(sitegate::AppState {
        config: config.clone(),
        pipeline,
    });

    let app = sitegate::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("sitegate listening on {}", bind_addr);

    // Graceful shutdown: on SIGTERM/SIGINT, stop accepting new
    // connections and let in-flight requests drain.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("sitegate shut down");

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
