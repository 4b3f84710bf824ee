//! API Routes
//!
//! - `POST /api/get-upload-signature` - Signed browser upload policy
//! - `POST /api/image-entry` - Record a `{imageId, key}` pair
//! - `POST /api/photos/upload` - Multipart batch: store, index and record photos
//! - `POST /api/photos/search` - Multipart batch: find faces similar to query photos
//! - `GET /api/health` - Health check

pub mod health;
pub mod image_entry;
pub mod photos;
pub mod signature;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .merge(signature::router())
        .merge(image_entry::router())
        .merge(photos::router())
        .merge(health::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
