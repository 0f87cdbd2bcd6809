//! Forecast API server.
//!
//! Serves point forecasts from the local column store over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use clap::Parser;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use forecast_api::handlers;
use forecast_api::state::AppState;

/// Forecast API server
#[derive(Parser, Debug)]
#[command(name = "forecast-api")]
#[command(about = "Point-forecast HTTP API over the local weather archive")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "FORECAST_LISTEN_ADDR")]
    listen: String,

    /// Domain registry file
    #[arg(short, long, default_value = "registry.json", env = "FORECAST_REGISTRY")]
    registry: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "FORECAST_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }
    let runtime = runtime_builder
        .build()
        .expect("Failed to create Tokio runtime");

    runtime.block_on(async move {
        run_server(args).await;
    });
}

async fn run_server(args: Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting forecast API server");

    let state = match AppState::from_config_file(&args.registry) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(registry = %args.registry.display(), "Failed to load registry: {e}");
            std::process::exit(1);
        }
    };
    info!(models = ?state.model_names(), "registry loaded");

    let app = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/:model", get(handlers::forecast_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = args.listen.parse().expect("Invalid listen address");
    info!("Forecast API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server failed");
}
