use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::errors::{RejectReason, ServiceError};
use thiserror::Error;
use tracing::error;

use common::types::ErrorBody;

const INTERNAL_MESSAGE: &str = "Internal server error.";

/// `{error}` JSON response with a status code. Only messages meant for the
/// client go in here; internal details are logged when converting.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub message: String,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Map a service error, using `fallback` as the client message for 5xx.
    pub fn from_service(err: ServiceError, fallback: &str) -> Self {
        match err {
            ServiceError::Validation(msg) => Self::bad_request(msg),
            ServiceError::UploadRejected { reason, message } => {
                let status = match reason {
                    RejectReason::UnsupportedType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    RejectReason::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                };
                Self::new(status, message)
            }
            other => {
                error!(error = %other, "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, fallback)
            }
        }
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(err: ServiceError) -> Self {
        Self::from_service(err, INTERNAL_MESSAGE)
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_status() {
        let e: JsonApiError = ServiceError::Validation("slotId is required.".into()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        assert_eq!(e.message, "slotId is required.");

        let e: JsonApiError = ServiceError::rejected(RejectReason::TooLarge, "too big").into();
        assert_eq!(e.status, StatusCode::PAYLOAD_TOO_LARGE);
        let e: JsonApiError = ServiceError::rejected(RejectReason::UnsupportedType, "nope").into();
        assert_eq!(e.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let e = JsonApiError::from_service(ServiceError::Storage("/var/secret: EACCES".into()), "Failed to save image.");
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message, "Failed to save image.");
    }
}
