use std::fmt::Display;

use models::errors::ModelError;
use thiserror::Error;

/// Why an upload was refused before anything touched the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnsupportedType,
    TooLarge,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::UnsupportedType => "unsupported_type",
            RejectReason::TooLarge => "too_large",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("upload rejected: {message}")]
    UploadRejected { reason: RejectReason, message: String },
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl ServiceError {
    pub fn storage(e: impl Display) -> Self {
        Self::Storage(e.to_string())
    }

    pub fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
        Self::UploadRejected { reason, message: message.into() }
    }
}
