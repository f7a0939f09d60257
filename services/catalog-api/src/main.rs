//! Open-data catalog API service.
//!
//! Serves per-project catalogs built from the content backend and keeps
//! them cached in memory until an update is requested.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{extract::Extension, routing::get};
use catalog_api::{config::ProjectsConfig, handlers, router, state::AppState};
use catalog_fetch::{ApiShape, FetcherConfig, HttpBackend};
use clap::Parser;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "catalog-api")]
#[command(about = "Open-data catalog API server")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Base URL of the content backend
    #[arg(long, env = "CMS_BASE_URL")]
    cms_base_url: String,

    /// Token for the structured (integration) API
    #[arg(long, env = "CMS_TOKEN", default_value = "")]
    cms_token: String,

    /// Shared secret required by POST /update-cache (empty disables the check)
    #[arg(long, env = "CACHE_UPDATE_KEY", default_value = "")]
    cache_update_key: String,

    /// Per-model fetch timeout in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 20)]
    fetch_timeout_secs: u64,

    /// Pages fetched concurrently per model
    #[arg(long, env = "FETCH_CONCURRENCY", default_value_t = 10)]
    fetch_concurrency: usize,

    /// YAML file listing the served projects
    #[arg(long, env = "CATALOG_CONFIG", default_value = "config/projects.yaml")]
    config: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    info!("Prometheus metrics exporter initialized");

    let projects = ProjectsConfig::load(&args.config)?;

    let fetcher = FetcherConfig {
        timeout: Duration::from_secs(args.fetch_timeout_secs),
        concurrency: args.fetch_concurrency.max(1),
        ..Default::default()
    };
    let public = HttpBackend::new(&args.cms_base_url, ApiShape::Public, fetcher.timeout)?;
    let integration = HttpBackend::new(&args.cms_base_url, ApiShape::Integration, fetcher.timeout)?
        .with_token(args.cms_token.as_str());

    let state = Arc::new(AppState::new(
        projects,
        Arc::new(public),
        Arc::new(integration),
        fetcher,
        Some(args.cache_update_key.clone()),
    ));

    info!(
        projects = state.projects.projects.len(),
        cms = %args.cms_base_url,
        "Starting catalog API server"
    );

    let app = router(state)
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(prometheus_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
