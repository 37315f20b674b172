use std::collections::BTreeMap;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use service::images::{ImageUpload, SlotId};
use utoipa::ToSchema;

use crate::errors::JsonApiError;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct ImagesResponse {
    pub images: BTreeMap<String, String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub slot_id: String,
    /// Public URL with a `?v=<ms>` cache buster.
    pub url: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub slot_id: String,
}

#[utoipa::path(
    get,
    path = "/api/images",
    tag = "images",
    responses(
        (status = 200, description = "Slot id to public URL", body = ImagesResponse),
        (status = 500, description = "Uploads could not be listed", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn list_images(State(state): State<AppState>) -> Result<Json<ImagesResponse>, JsonApiError> {
    let images = state
        .images
        .list()
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to list images."))?;
    Ok(Json(ImagesResponse { images }))
}

#[utoipa::path(
    post,
    path = "/api/images/{slotId}",
    tag = "images",
    params(("slotId" = String, Path, description = "Image slot identifier")),
    request_body(content = crate::openapi::ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing slot or file", body = crate::openapi::ErrorResponse),
        (status = 413, description = "Image too large", body = crate::openapi::ErrorResponse),
        (status = 415, description = "Not an image", body = crate::openapi::ErrorResponse),
        (status = 500, description = "Image could not be written", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    Path(slot_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, JsonApiError> {
    let slot = SlotId::parse(&slot_id)?;
    let mut multipart =
        multipart.map_err(|_| JsonApiError::bad_request("Request must be multipart/form-data with a file field."))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some(ImageUpload { bytes: bytes.to_vec(), file_name, content_type });
        break;
    }
    let upload = upload.ok_or_else(|| JsonApiError::bad_request("No file uploaded."))?;

    let path = state
        .images
        .put(&slot, upload)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to save image."))?;
    Ok(Json(UploadResponse {
        slot_id: slot.to_string(),
        url: format!("{path}?v={}", Utc::now().timestamp_millis()),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/images/{slotId}",
    tag = "images",
    params(("slotId" = String, Path, description = "Image slot identifier")),
    responses(
        (status = 200, description = "Slot cleared (also when it was empty)", body = DeleteResponse),
        (status = 400, description = "Invalid slot id", body = crate::openapi::ErrorResponse),
        (status = 500, description = "Files could not be removed", body = crate::openapi::ErrorResponse)
    )
)]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(slot_id): Path<String>,
) -> Result<Json<DeleteResponse>, JsonApiError> {
    let slot = SlotId::parse(&slot_id)?;
    state
        .images
        .delete(&slot)
        .await
        .map_err(|e| JsonApiError::from_service(e, "Failed to delete image."))?;
    Ok(Json(DeleteResponse { slot_id: slot.to_string() }))
}

pub async fn missing_slot() -> JsonApiError {
    JsonApiError::bad_request("slotId is required.")
}

fn multipart_error(e: MultipartError) -> JsonApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        JsonApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Image exceeds the upload size limit.")
    } else {
        JsonApiError::bad_request(format!("Invalid multipart body: {}", e.body_text()))
    }
}
