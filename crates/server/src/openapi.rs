use std::collections::BTreeMap;

use utoipa::OpenApi;
use utoipa::ToSchema;

use crate::routes::content::ContentResponse;
use crate::routes::images::{DeleteResponse, ImagesResponse, UploadResponse};

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Only string values are stored; anything else in `content` is dropped.
#[derive(ToSchema)]
pub struct ContentUpdateRequest {
    pub content: BTreeMap<String, String>,
}

#[derive(ToSchema)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::content::get_content,
        crate::routes::content::put_content,
        crate::routes::images::list_images,
        crate::routes::images::upload_image,
        crate::routes::images::delete_image,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            ContentUpdateRequest,
            ContentResponse,
            ImageUploadForm,
            ImagesResponse,
            UploadResponse,
            DeleteResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "content"),
        (name = "images")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in ["/api/health", "/api/content", "/api/images", "/api/images/{slotId}"] {
            assert!(paths.contains(&expected), "missing {expected} in {paths:?}");
        }
    }
}
