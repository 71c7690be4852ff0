use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct HealthReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl HealthReport {
    fn ready(detail: impl Into<String>) -> Self {
        Self {
            status: "ready",
            detail: Some(detail.into()),
        }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self {
            status: "degraded",
            detail: Some(detail.into()),
        }
    }
}

/// 辞書が読み込まれ、優先順位表が空でなければ準備完了とみなす。
pub(crate) async fn ready(
    State(state): State<AppState>,
) -> Result<Json<HealthReport>, (StatusCode, Json<HealthReport>)> {
    state.telemetry().record_ready_probe();

    let classifier = state.classifier();
    let industries = classifier.store().priority().len();
    if industries == 0 {
        error!("lexicon has no industries");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthReport::degraded("lexicon: no industries loaded")),
        ));
    }

    Ok(Json(HealthReport::ready(format!(
        "lexicon: {industries} industries"
    ))))
}

pub(crate) async fn live(State(state): State<AppState>) -> Json<HealthReport> {
    state.telemetry().record_live_probe();
    Json(HealthReport {
        status: "live",
        detail: None,
    })
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::app::{build_router, tests::test_registry};

    #[tokio::test]
    async fn ready_reports_loaded_lexicon() {
        let app = build_router(test_registry());

        let request = Request::get("/health/ready")
            .body(Body::empty())
            .expect("request builds");
        let response = app.oneshot(request).await.expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);

        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let payload: serde_json::Value = serde_json::from_slice(&body_bytes).expect("valid json");
        assert_eq!(payload["status"], "ready");
        assert!(
            payload["detail"]
                .as_str()
                .is_some_and(|detail| detail.starts_with("lexicon:"))
        );
    }

    #[tokio::test]
    async fn live_always_answers() {
        let app = build_router(test_registry());
        let request = Request::get("/health/live")
            .body(Body::empty())
            .expect("request builds");
        let response = app.oneshot(request).await.expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
