use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::state::AppState;

pub mod dto;
pub mod events;
pub mod handler;
pub mod model;
pub mod repository;
pub mod service;

// Uploads can be large; the default 2 MB axum body limit is far too small.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

pub fn router(_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(handler::upload_video).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/jobs", get(handler::list_jobs))
        .route("/jobs/{id}", get(handler::get_job))
}
