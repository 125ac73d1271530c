//! Ena Healthy API - Main Entry Point
//!
//! Loads the diagnosis, stage and recurrence-risk models, then serves
//! predictions over HTTP until interrupted.

use anyhow::{Context, Result};
use ena_healthy_api::{
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    models::ModelLoader,
    server::{self, AppState},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config.logging)?;
    info!("Starting Ena Healthy API v{}", env!("CARGO_PKG_VERSION"));
    info!(
        models_dir = %config.models.models_dir,
        strict_status_codes = config.server.strict_status_codes,
        "Configuration loaded"
    );

    // Required models must load before anything is served
    let loader = ModelLoader::with_threads(config.models.onnx_threads)?;
    let service = loader
        .load_service(&config.models)
        .context("Failed to load models")?;
    info!(classes = ?service.stage_classes(), "DSO2 stage classes");

    if service.risk_available() {
        info!(
            features = ?service.risk_feature_count(),
            "DSO3 recurrence-risk endpoint enabled"
        );
    } else {
        warn!("DSO3 recurrence-risk endpoint disabled");
    }

    let metrics = Arc::new(ServiceMetrics::new());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let state = AppState::new(service, metrics.clone(), config.server.strict_status_codes);
    let app = server::router(state, &config.server)?;

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, origins = ?config.server.cors_origins, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Print final summary
    info!("Server shutting down...");
    metrics.print_summary();

    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level applies to this crate
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("tower_http=info")
            .add_directive(format!("ena_healthy_api={}", logging.level).parse()?),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
