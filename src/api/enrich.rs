use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    api::ErrorResponse,
    app::AppState,
    pipeline::{RawListing, ServiceRecord, prepare_listings},
};

/// 1リクエストで受け付ける最大掲載数。
pub(crate) const MAX_LISTINGS: usize = 200;

#[derive(Debug, Deserialize)]
pub(crate) struct EnrichRequest {
    listings: Vec<RawListing>,
}

#[derive(Debug, Serialize)]
struct EnrichResponse {
    records: Vec<ServiceRecord>,
    skipped: usize,
}

/// 掲載を前処理してからエンリッチし、入力順（重複除去後）でレコードを返す。
pub(crate) async fn enrich(
    State(state): State<AppState>,
    Json(payload): Json<EnrichRequest>,
) -> impl IntoResponse {
    let received = payload.listings.len();
    if received == 0 {
        let body = Json(ErrorResponse::new(
            "listings array must include at least one entry",
        ));
        return (StatusCode::BAD_REQUEST, body).into_response();
    }
    if received > MAX_LISTINGS {
        let body = Json(ErrorResponse::new(format!(
            "listings must not exceed {MAX_LISTINGS} entries"
        )));
        return (StatusCode::PAYLOAD_TOO_LARGE, body).into_response();
    }

    let listings = prepare_listings(payload.listings);
    let skipped = received - listings.len();
    let records = state.enricher().enrich_all(&listings).await;
    info!(received, skipped, records = records.len(), "listings enriched");

    (StatusCode::OK, Json(EnrichResponse { records, skipped })).into_response()
}
