use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::models::AppState;
use crate::signing::{PolicySigner, UploadSignature};
use crate::types::{ApiResponse, AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    /// Defaults to the configured bucket
    pub bucket_name: Option<String>,
    #[serde(default)]
    pub prefix: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/get-upload-signature", post(get_upload_signature))
}

async fn get_upload_signature(
    State(state): State<AppState>,
    payload: Result<Json<SignatureRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<UploadSignature>>> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let bucket = request
        .bucket_name
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| state.config.aws.bucket.clone());

    let signer = PolicySigner::from_config(&state.config.aws)?;
    let signature = signer.sign(&bucket, &request.prefix, chrono::Utc::now())?;

    info!(bucket = %bucket, prefix = %request.prefix, "Upload signature issued");
    Ok(Json(ApiResponse::ok(signature)))
}
