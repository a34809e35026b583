//! chatd - real-time chat service core
//!
//! Connection registry, message pipeline, and cache-coherent services
//! fronted by an HTTP/WebSocket façade.

mod broker;
mod cache;
mod config;
mod db;
mod error;
mod http;
mod ids;
mod metrics;
mod pipeline;
mod registry;
mod services;
mod state;
mod telemetry;
mod wire;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::broker::{BrokerConsumer, BrokerProducer};
use crate::cache::Cache;
use crate::config::Config;
use crate::db::Database;
use crate::pipeline::Pipeline;
use crate::registry::ConnectionRegistry;
use crate::services::ServiceContext;
use crate::state::{AppState, AppStateParams};

/// Resolve the configuration path from CLI arguments.
/// Supports `-c <path>`, `--config <path>`, or a bare path. Falls back to
/// `config.toml` when no argument is provided.
fn resolve_config_path() -> String {
    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(flag) if flag == "-c" || flag == "--config" => args.next().unwrap_or_else(|| {
            eprintln!("Missing path after {flag}");
            std::process::exit(1);
        }),
        Some(path) => path,
        None => "config.toml".to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = resolve_config_path();
    let config = Config::load(&config_path).map_err(|e| {
        eprintln!("ERROR: failed to load config from {config_path}: {e}");
        e
    })?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log.format {
        crate::config::LogFormat::Json => {
            tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).json().init();
        }
        crate::config::LogFormat::Pretty => {
            tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).init();
        }
    }

    if let Err(errors) = crate::config::validate(&config) {
        for err in &errors {
            error!(error = %err, "configuration validation failed");
        }
        return Err(anyhow::anyhow!("configuration validation failed with {} error(s)", errors.len()));
    }

    info!(listen = %config.server.listen, "starting chatd");

    let db = Database::new(&config.mysql.dsn, config.mysql.max_connections).await?;
    let cache = Cache::connect(&config.redis.dsn, config.server.default_cache_ttl_secs).await?;

    broker::ensure_topic(&config.kafka).await?;
    let producer = BrokerProducer::new(&config.kafka)?;
    let consumer = BrokerConsumer::new(&config.kafka)?;

    metrics::init();
    info!("metrics initialized");

    let registry = Arc::new(ConnectionRegistry::new());
    let services = ServiceContext::new(db.clone(), cache.clone());
    let state = AppState::new(AppStateParams {
        services,
        registry: registry.clone(),
        producer,
        config: config.clone(),
    });

    let shutdown = CancellationToken::new();

    let pipeline = Pipeline::new(consumer, db, cache, registry);
    let pipeline_shutdown = shutdown.clone();
    let pipeline_task = tokio::spawn(async move {
        pipeline.run(pipeline_shutdown).await;
    });
    info!("pipeline consumer started");

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
            let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = sigint.recv() => info!("received SIGINT, initiating graceful shutdown"),
                _ = sigterm.recv() => info!("received SIGTERM, initiating graceful shutdown"),
            }
            shutdown.cancel();
        });
    }

    let listen = config.server.listen;
    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(addr = %listen, "http façade listening");

    let shutdown_timeout = std::time::Duration::from_secs(config.server.shutdown_timeout_secs);
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            server_shutdown.cancelled().await;
        })
        .await?;

    shutdown.cancel();
    if tokio::time::timeout(shutdown_timeout, pipeline_task).await.is_err() {
        error!("pipeline consumer did not drain within shutdown deadline");
    }

    info!("chatd stopped");
    Ok(())
}
