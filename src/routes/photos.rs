use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::models::{AppState, SearchReport, UploadFile, UploadReport};
use crate::pipeline::Pipeline;
use crate::types::{ApiResponse, AppError, AppResult};

/// A batch report plus its errors joined for display
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse<R> {
    #[serde(flatten)]
    pub report: R,
    pub error_message: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/photos/upload", post(upload_photos))
        .route("/api/photos/search", post(search_photos))
}

/// Every part carrying a non-empty file name becomes one photo of the batch.
async fn read_files(mut multipart: Multipart) -> AppResult<Vec<UploadFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.body_text()))?
    {
        // Browsers send an empty filename for a file input left blank.
        let Some(name) = field
            .file_name()
            .filter(|n| !n.is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(e.body_text()))?;

        files.push(UploadFile::new(name, content_type, bytes));
    }

    if files.is_empty() {
        return Err(AppError::InvalidRequest("No files in request".into()));
    }
    Ok(files)
}

async fn upload_photos(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<BatchResponse<UploadReport>>>> {
    let files = read_files(multipart).await?;
    info!(files = files.len(), "Photo upload request received");

    let report = Pipeline::from_state(&state).upload_batch(&files).await;
    let error_message = report.error_message();
    Ok(Json(ApiResponse::ok(BatchResponse {
        report,
        error_message,
    })))
}

async fn search_photos(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<BatchResponse<SearchReport>>>> {
    let files = read_files(multipart).await?;
    info!(files = files.len(), "Photo search request received");

    let report = Pipeline::from_state(&state).search_batch(&files).await;
    let error_message = report.error_message();
    Ok(Json(ApiResponse::ok(BatchResponse {
        report,
        error_message,
    })))
}
