//! API route definitions

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use crate::{
    config::normalize_prefix,
    handlers::{forge, health, materials},
    middleware::{auth_middleware, logging_middleware, rate_limit_middleware, request_id_middleware},
    state::AppState,
};

/// Room for multipart framing on top of the upload size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Versioned routes, guarded by rate limiting and API key auth.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let body_limit = state.forge.validator().config().max_upload_size_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/ping", get(health::ping))
        .route("/materials/upload", post(materials::upload_material))
        .route(
            "/materials/{id}",
            get(materials::get_material).delete(materials::delete_material),
        )
        .route("/materials/{id}/preview", get(materials::get_preview))
        .route("/forge", post(forge::forge_icon))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
        .route_layer(from_fn_with_state(state.clone(), rate_limit_middleware))
}

/// OpenAPI document route
pub fn docs_routes() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the complete application router.
pub fn build_router(state: AppState) -> Router {
    let prefix = normalize_prefix(&state.config.api_prefix);
    let api = api_routes(&state);

    let router = Router::new()
        .route("/health", get(health::health_check))
        .merge(docs_routes());
    let router = if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(&prefix, api)
    };

    router
        .layer(CorsLayer::permissive())
        .layer(from_fn(logging_middleware))
        .layer(from_fn_with_state(state.clone(), request_id_middleware))
        .with_state(state)
}

/// OpenAPI document for the API
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::ping,
        materials::upload_material,
        materials::get_material,
        materials::delete_material,
        materials::get_preview,
        forge::forge_icon,
    ),
    components(schemas(
        crate::models::MaterialResponse,
        crate::models::PreviewResponse,
        crate::models::HealthResponse,
        crate::models::PingResponse,
        crate::models::ProblemDetails,
        materials::UploadForm,
        forge::ForgeForm,
    )),
    info(
        title = "IconForge API",
        version = "1.0.0",
        description = "Upload images, preview resized materials and forge multi-resolution ICO files"
    )
)]
pub struct ApiDoc;
