use crate::docs::ApiDoc;
use crate::state::AppState;
use axum::{Json, Router};
use serde_json::json;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower_http::cors::{Any, CorsLayer};

pub fn configure_routes(state: AppState) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", axum::routing::get(root))
        .route("/health", axum::routing::get(health))
        .nest("/api", crate::modules::job::router(state))
        .layer(cors)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Promptcut API is running" }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}
