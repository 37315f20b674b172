use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::static_guard::{hide_private, PrivatePaths};

pub mod content;
pub mod health;
pub mod images;

/// JSON body ceiling for the content endpoint.
pub const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;
/// Room for multipart boundaries and headers on top of the image itself.
pub const MULTIPART_SLACK: usize = 64 * 1024;

const UPLOAD_CACHE_CONTROL: &str = "public, max-age=86400";

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn metrics() -> impl axum::response::IntoResponse {
    service::observability::encode_metrics()
}

/// Build the full application router: API, uploads, static site fallback.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let image_limit = state.images.max_size().saturating_add(MULTIPART_SLACK);

    let api = Router::new()
        .route("/api/health", get(health::health))
        .route(
            "/api/content",
            get(content::get_content)
                .put(content::put_content)
                .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT)),
        )
        .route("/api/images", get(images::list_images))
        .route(
            "/api/images/",
            post(images::missing_slot).delete(images::missing_slot),
        )
        .route(
            "/api/images/:slot_id",
            post(images::upload_image)
                .delete(images::delete_image)
                .layer(DefaultBodyLimit::max(image_limit)),
        )
        .route("/api/openapi.json", get(openapi_json))
        .route("/metrics", get(metrics));

    let uploads = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(Arc::new(PrivatePaths::default()), hide_private))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(UPLOAD_CACHE_CONTROL),
        ))
        .service(ServeDir::new(&state.upload_dir));
    let site = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(Arc::clone(&state.private_paths), hide_private))
        .service(ServeDir::new(&state.site_root));
    let public_upload_path = state.public_upload_path.clone();

    api.with_state(state)
        .nest_service(&public_upload_path, uploads)
        .fallback_service(site)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                // 响应返回时打点，包含状态码与耗时
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
