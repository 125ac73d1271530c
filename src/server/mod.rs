//! HTTP surface: router, shared state and CORS

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::metrics::ServiceMetrics;
use crate::models::SubModel;
use crate::service::PredictionService;
use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub metrics: Arc<ServiceMetrics>,
    /// Report validation/availability errors with 4xx/5xx instead of 200
    pub strict_status_codes: bool,
}

impl AppState {
    pub fn new(service: PredictionService, metrics: Arc<ServiceMetrics>, strict: bool) -> Self {
        Self {
            service: Arc::new(service),
            metrics,
            strict_status_codes: strict,
        }
    }
}

/// CORS layer for the configured origin allow-list
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin {o:?}"))
        })
        .collect::<Result<Vec<_>>>()?;

    // credentials rule out wildcards, so methods and headers are mirrored
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Build the router with every route and middleware layer
pub fn router(state: AppState, config: &ServerConfig) -> Result<Router> {
    let cors = cors_layer(&config.cors_origins)?;

    Ok(Router::new()
        .route("/", get(root))
        .route(SubModel::Diagnosis.route(), post(predict_diagnosis))
        .route(SubModel::Stage.route(), post(predict_stage))
        .route(SubModel::Risk.route(), post(predict_risk))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}
