use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::models::{AppState, ImageEntry};
use crate::types::{ApiResponse, AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntryRequest {
    #[validate(length(min = 1))]
    pub image_id: String,
    #[validate(length(min = 1))]
    pub key: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/image-entry", post(create_image_entry))
}

async fn create_image_entry(
    State(state): State<AppState>,
    payload: Result<Json<ImageEntryRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<ImageEntry>>> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    request
        .validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let entry = state.entries.insert(&request.image_id, &request.key).await?;
    Ok(Json(ApiResponse::ok(entry)))
}
