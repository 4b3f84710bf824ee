// Facefind - photo upload and face search over S3 and Rekognition

pub mod client;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod recognition;
pub mod routes;
pub mod signing;
pub mod storage;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
