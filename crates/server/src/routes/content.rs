use std::collections::BTreeMap;

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use service::content::{sanitize_content, ContentRead};
use tracing::info;
use utoipa::ToSchema;

use crate::errors::JsonApiError;
use crate::state::AppState;

const CONTENT_REQUIRED: &str = "Request body must include a content object.";

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    pub content: BTreeMap<String, String>,
    /// ISO-8601 time of the last write, or of this response when nothing was written yet.
    pub updated_at: String,
}

impl From<ContentRead> for ContentResponse {
    fn from(read: ContentRead) -> Self {
        let updated_at = read
            .snapshot
            .updated_at
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        Self { content: read.snapshot.content, updated_at }
    }
}

#[utoipa::path(
    get,
    path = "/api/content",
    tag = "content",
    responses(
        (status = 200, description = "Current content map", body = ContentResponse),
        (status = 500, description = "No content backend could be read", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn get_content(State(state): State<AppState>) -> Result<Json<ContentResponse>, JsonApiError> {
    let read = state
        .content
        .load()
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to load content."))?;
    Ok(Json(read.into()))
}

#[utoipa::path(
    put,
    path = "/api/content",
    tag = "content",
    request_body = crate::openapi::ContentUpdateRequest,
    responses(
        (status = 200, description = "Content replaced", body = ContentResponse),
        (status = 400, description = "Body has no content object", body = crate::openapi::ErrorResponse),
        (status = 500, description = "No content backend accepted the write", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn put_content(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ContentResponse>, JsonApiError> {
    let Json(body) = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => JsonApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large."),
        _ => JsonApiError::bad_request(CONTENT_REQUIRED),
    })?;
    let content = body
        .get("content")
        .and_then(sanitize_content)
        .ok_or_else(|| JsonApiError::bad_request(CONTENT_REQUIRED))?;

    let saved = state
        .content
        .save(content)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to save content."))?;
    info!(
        event = "content_saved",
        backend = saved.served_by,
        generation = saved.generation,
        keys = saved.snapshot.content.len(),
        "content replaced"
    );
    Ok(Json(saved.into()))
}
