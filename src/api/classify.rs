use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    api::ErrorResponse,
    app::AppState,
    classification::{ClassificationInput, ClassificationResult},
};

/// 1リクエストで受け付ける最大件数。
pub(crate) const MAX_BATCH_INPUTS: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ClassifyRequest {
    Batch { inputs: Vec<ClassificationInput> },
    Single(ClassificationInput),
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    results: Vec<ClassificationResult>,
}

pub(crate) async fn classify(
    State(state): State<AppState>,
    Json(payload): Json<ClassifyRequest>,
) -> impl IntoResponse {
    let classifier = state.classifier();

    match payload {
        ClassifyRequest::Single(input) => {
            let started = Instant::now();
            let result = classifier.classify_input(&input);
            state
                .telemetry()
                .metrics()
                .record_classification(&result, started.elapsed());
            (StatusCode::OK, Json(result)).into_response()
        }
        ClassifyRequest::Batch { inputs } => {
            if inputs.is_empty() {
                let body = Json(ErrorResponse::new("inputs must include at least one entry"));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            if inputs.len() > MAX_BATCH_INPUTS {
                let body = Json(ErrorResponse::new(format!(
                    "inputs must not exceed {MAX_BATCH_INPUTS} entries"
                )));
                return (StatusCode::PAYLOAD_TOO_LARGE, body).into_response();
            }

            let count = inputs.len();
            let started = Instant::now();
            let results =
                tokio::task::spawn_blocking(move || classifier.classify_batch(&inputs)).await;
            match results {
                Ok(results) => {
                    let per_input = started.elapsed() / u32::try_from(count).unwrap_or(u32::MAX);
                    let metrics = state.telemetry().metrics();
                    for result in &results {
                        metrics.record_classification(result, per_input);
                    }
                    info!(count, "batch classified");
                    (StatusCode::OK, Json(BatchResponse { results })).into_response()
                }
                Err(join_error) => {
                    error!(error = %join_error, "batch classification task failed");
                    let body = Json(ErrorResponse::new("classification failed"));
                    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::app::{build_router, tests::test_registry};

    async fn post(body: String) -> (StatusCode, serde_json::Value) {
        let app = build_router(test_registry());
        let request = Request::post("/v1/classify")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request builds");
        let response = app.oneshot(request).await.expect("request succeeds");
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let payload = serde_json::from_slice(&body_bytes).expect("valid json");
        (status, payload)
    }

    #[tokio::test]
    async fn single_input_returns_result() {
        let body = serde_json::json!({
            "text": "保険業界向けの契約管理システムを刷新",
        });
        let (status, payload) = post(body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["industry"], "保険");
        assert_eq!(payload["fallback"], false);
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let body = serde_json::json!({
            "inputs": [
                { "text": "保険業界向けの契約管理システムを刷新" },
                { "text": "" },
            ]
        });
        let (status, payload) = post(body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        let results = payload["results"].as_array().expect("results array");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["industry"], "保険");
        assert_eq!(results[1]["fallback"], true);
        assert_eq!(results[1]["industry"], "その他");
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let (status, payload) = post(r#"{"inputs": []}"#.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let inputs = vec![serde_json::json!({ "text": "物流" }); MAX_BATCH_INPUTS + 1];
        let body = serde_json::json!({ "inputs": inputs });
        let (status, _) = post(body.to_string()).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
