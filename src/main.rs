//! Photo Restorer - a restoration service for old photographs.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photo_restorer::{
    cache::{FsStore, ResultCache, SystemClock},
    config::Config,
    model::{BuiltinModelProvider, ModelGateway},
    pipeline::RestoreService,
    server::{create_router, RouterConfig},
    tier::TieringStage,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Output directory: {}", config.output_dir);
    info!(
        "  Cache: {} entries, {}s TTL, sweep every {}s",
        config.cache_capacity, config.cache_ttl_secs, config.sweep_interval_secs
    );
    info!(
        "  Tiers: preview <= {}px, hd <= {}px",
        config.preview_max_dim, config.hd_max_dim
    );
    match config.payment_url {
        Some(ref url) => info!("  Payment URL: {}", url),
        None => warn!("  Payment URL: not configured - responses omit the upgrade link"),
    }

    // Create the artifact store
    let store = match FsStore::new(&config.output_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open output directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Wire up the pipeline
    let gateway = Arc::new(ModelGateway::new(Arc::new(BuiltinModelProvider::new())));
    let cache = Arc::new(ResultCache::new(
        Duration::from_secs(config.cache_ttl_secs),
        config.cache_capacity,
        Arc::new(SystemClock),
    ));
    let service = Arc::new(RestoreService::new(
        gateway,
        cache,
        store,
        TieringStage::new(config.preview_max_dim, config.hd_max_dim),
        config.max_input_dim,
    ));

    // Warm the models so the first request doesn't pay the load cost.
    // Failure is non-fatal: the first request re-attempts the load.
    info!("Warming up models...");
    match service.warm_up().await {
        Ok(()) => info!("  Models ready"),
        Err(e) => warn!("  Model warm-up failed, will retry on first request: {}", e),
    }

    // Background sweep of expired cache entries and their artifacts
    spawn_sweeper(service.clone(), Duration::from_secs(config.sweep_interval_secs));

    // Create router
    let router = create_router(service, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -F file=@photo.jpg -F colorize=true http://{}/restore",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "photo_restorer=debug,tower_http=debug"
    } else {
        "photo_restorer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Periodically evict expired cache entries and their persisted artifacts.
fn spawn_sweeper(service: Arc<RestoreService>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = service.sweep_expired().await;
            if removed > 0 {
                info!(removed, "swept expired cache entries");
            }
        }
    });
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_max_upload_bytes(config.max_upload_bytes)
        .with_payment_url(config.payment_url.clone())
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
