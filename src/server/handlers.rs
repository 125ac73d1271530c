//! HTTP request handlers

use crate::error::PredictError;
use crate::models::SubModel;
use crate::server::AppState;
use crate::types::{
    Banner, DiagnosisResponse, ErrorResponse, FeatureRequest, Reply, RiskResponse, StageResponse,
};
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, Json};
use std::time::Instant;
use tracing::{debug, error, info};

type Answer<T> = (StatusCode, Json<Reply<T>>);

/// Service banner with the active endpoints
pub async fn root(State(state): State<AppState>) -> Json<Banner> {
    Json(state.service.banner())
}

/// DSO1: benign vs malignant
pub async fn predict_diagnosis(
    State(state): State<AppState>,
    Json(payload): Json<FeatureRequest>,
) -> Answer<DiagnosisResponse> {
    let start = Instant::now();
    let result = state.service.predict_diagnosis(&payload.features);
    respond(&state, SubModel::Diagnosis, start, result, |r| {
        (r.diagnosis.clone(), Some(r.probability_malignant))
    })
}

/// DSO2: tumour stage
pub async fn predict_stage(
    State(state): State<AppState>,
    Json(payload): Json<FeatureRequest>,
) -> Answer<StageResponse> {
    let start = Instant::now();
    let result = state.service.predict_stage(&payload.features);
    respond(&state, SubModel::Stage, start, result, |r| {
        (r.predicted_stage.clone(), None)
    })
}

/// DSO3: recurrence risk.
///
/// Without a risk model every request gets the unavailability error, so
/// the body is only parsed once the model is known to be loaded.
pub async fn predict_risk(
    State(state): State<AppState>,
    payload: Result<Json<FeatureRequest>, JsonRejection>,
) -> Result<Answer<RiskResponse>, JsonRejection> {
    let start = Instant::now();
    let features = match payload {
        Ok(Json(payload)) => payload.features,
        Err(rejection) if state.service.risk_available() => return Err(rejection),
        Err(_) => Vec::new(),
    };
    let result = state.service.predict_risk(&features);
    Ok(respond(&state, SubModel::Risk, start, result, |r| {
        (r.risk_level.clone(), Some(r.probability_recurrence))
    }))
}

/// Record metrics and shape the reply for a prediction result
fn respond<T>(
    state: &AppState,
    sub: SubModel,
    start: Instant,
    result: Result<T, PredictError>,
    outcome: impl FnOnce(&T) -> (String, Option<f64>),
) -> Answer<T> {
    match result {
        Ok(body) => {
            let latency = start.elapsed();
            let (label, probability) = outcome(&body);
            state
                .metrics
                .record_prediction(sub, latency, &label, probability);
            debug!(
                model = %sub,
                label = %label,
                latency_us = latency.as_micros() as u64,
                "Prediction served"
            );
            (StatusCode::OK, Json(Reply::Ok(body)))
        }
        Err(e) => {
            match &e {
                PredictError::Inference { .. } => {
                    state.metrics.record_failure(sub);
                    error!(model = %sub, error = %e, "Inference failed");
                }
                PredictError::FeatureCount { .. } | PredictError::Unavailable { .. } => {
                    state.metrics.record_rejection(sub);
                    info!(model = %sub, reason = %e, "Request rejected");
                }
            }
            (
                e.status_code(state.strict_status_codes),
                Json(Reply::Err(ErrorResponse::new(e.to_string()))),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ServiceMetrics;
    use crate::models::ClassifierOutput;
    use crate::service::testing::{default_service, service, Failing, FixedClassifier};
    use crate::types::request::{WDBC_SAMPLE, WPBC_SAMPLE};
    use std::sync::Arc;

    fn test_state() -> AppState {
        AppState::new(default_service(), Arc::new(ServiceMetrics::new()), false)
    }

    fn without_risk(strict: bool) -> AppState {
        let svc = service(
            FixedClassifier::new(ClassifierOutput::dense(vec![0.2])),
            FixedClassifier::new(ClassifierOutput::keyed(vec![(0, 0.9), (1, 0.1)])),
            vec![0, 1],
            None,
        );
        AppState::new(svc, Arc::new(ServiceMetrics::new()), strict)
    }

    #[tokio::test]
    async fn test_root_banner() {
        let Json(banner) = root(State(test_state())).await;
        assert_eq!(banner.version, env!("CARGO_PKG_VERSION"));
        assert!(banner.endpoints.contains_key("/predict"));
        assert!(banner.endpoints.contains_key("/predict_stage"));

        let Json(banner) = root(State(without_risk(false))).await;
        assert_eq!(banner.endpoints["/predict_risk"], "DSO3 unavailable");
    }

    #[tokio::test]
    async fn test_predict_diagnosis() {
        let state = test_state();
        let (status, Json(reply)) =
            predict_diagnosis(State(state.clone()), Json(FeatureRequest::wdbc_sample())).await;

        assert_eq!(status, StatusCode::OK);
        let body = reply.ok().unwrap();
        assert_eq!(body.diagnosis, "Malignant");
        assert_eq!(body.probability_malignant, 0.9731);
        assert_eq!(state.metrics.requests(SubModel::Diagnosis), 1);
        assert_eq!(state.metrics.get_outcomes(SubModel::Diagnosis)["Malignant"], 1);
    }

    #[tokio::test]
    async fn test_predict_diagnosis_wrong_length_is_200_error() {
        let state = test_state();
        let (status, Json(reply)) =
            predict_diagnosis(State(state.clone()), Json(FeatureRequest::new(vec![1.0_f64; 5]))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply.err().unwrap().error, "DSO1 expects 30 features, received 5");
        assert_eq!(state.metrics.rejected(SubModel::Diagnosis), 1);
    }

    #[tokio::test]
    async fn test_strict_status_codes() {
        let state = without_risk(true);

        let (status, _) =
            predict_stage(State(state.clone()), Json(FeatureRequest::wpbc_sample())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = predict_risk(State(state), Ok(Json(FeatureRequest::wpbc_sample())))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_predict_stage() {
        let (status, Json(reply)) =
            predict_stage(State(test_state()), Json(FeatureRequest::new(WDBC_SAMPLE))).await;

        assert_eq!(status, StatusCode::OK);
        let body = reply.ok().unwrap();
        assert_eq!(body.predicted_stage, "Stage II");
        assert_eq!(body.stage_code, 2);
        assert_eq!(body.probabilities.len(), 5);
        assert_eq!(body.probabilities["Benign (0)"], 0.0);
    }

    #[tokio::test]
    async fn test_predict_stage_json_shape() {
        let (_, Json(reply)) =
            predict_stage(State(without_risk(false)), Json(FeatureRequest::new(WDBC_SAMPLE))).await;

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["predicted_stage"], "Benign (0)");
        assert_eq!(json["stage_code"], 0);
        assert_eq!(json["probabilities"].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_predict_risk() {
        let (status, Json(reply)) =
            predict_risk(State(test_state()), Ok(Json(FeatureRequest::new(WPBC_SAMPLE))))
                .await
                .unwrap();

        assert_eq!(status, StatusCode::OK);
        let body = reply.ok().unwrap();
        assert_eq!(body.risk_level, "High");
        assert_eq!(body.future_risk_probability_percent, 70.0);
    }

    #[tokio::test]
    async fn test_predict_risk_unavailable() {
        let state = without_risk(false);
        for payload in [FeatureRequest::wpbc_sample(), FeatureRequest::new(Vec::<f64>::new())] {
            let (status, Json(reply)) = predict_risk(State(state.clone()), Ok(Json(payload)))
                .await
                .unwrap();
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                reply.err().unwrap().error,
                "DSO3 unavailable: train and save risk.onnx + risk_scaler.json"
            );
        }
        assert_eq!(state.metrics.rejected(SubModel::Risk), 2);
    }

    #[tokio::test]
    async fn test_inference_failure_is_500() {
        let svc = service(
            Arc::new(Failing),
            FixedClassifier::new(ClassifierOutput::dense(vec![1.0])),
            vec![0],
            None,
        );
        let state = AppState::new(svc, Arc::new(ServiceMetrics::new()), false);

        let (status, Json(reply)) =
            predict_diagnosis(State(state.clone()), Json(FeatureRequest::wdbc_sample())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(reply.err().unwrap().error.contains("DSO1 inference failed"));
        assert_eq!(state.metrics.failed(SubModel::Diagnosis), 1);
    }
}
