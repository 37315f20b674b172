//! Image slots: one stored file per slot, exposed under a public URL prefix.
//!
//! The filesystem is the authoritative backend; an optional metadata table is
//! kept as a best-effort mirror.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::errors::ServiceError;

pub mod db;
pub mod fs;
pub mod store;

pub use db::DbImageMirror;
pub use fs::FsImageBackend;
pub use store::{ImageStore, ImageUpload};

/// `slot id -> public url`
pub type ImageMap = BTreeMap<String, String>;

/// Longest slot id accepted; matches the metadata key column.
pub const SLOT_ID_MAX_LEN: usize = 191;

/// Extension used when the upload's file name carries none.
pub const DEFAULT_EXTENSION: &str = "webp";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(String);

impl SlotId {
    /// Validate a slot id taken from a request path. Slot ids become file
    /// names, so separators and leading dots are refused.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let slot = raw.trim();
        if slot.is_empty() {
            return Err(ServiceError::Validation("slotId is required.".into()));
        }
        if slot.len() > SLOT_ID_MAX_LEN {
            return Err(ServiceError::Validation("slotId is too long.".into()));
        }
        if slot.starts_with('.') || slot.contains(['/', '\\', '\0']) {
            return Err(ServiceError::Validation("slotId contains invalid characters.".into()));
        }
        Ok(Self(slot.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An accepted upload, ready to be written.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub slot: SlotId,
    pub file_name: String,
    pub public_path: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Source of truth; consulted for every read and write.
    Authoritative,
    /// Kept in sync best-effort; failures are logged, never returned.
    Mirror,
}

#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn capability(&self) -> Capability;
    async fn list(&self) -> Result<ImageMap, ServiceError>;
    async fn put(&self, image: &PreparedImage) -> Result<(), ServiceError>;
    async fn delete(&self, slot: &SlotId) -> Result<(), ServiceError>;
}

/// `slot` + lowercased extension of `original`, or `.webp` when it has none.
pub fn image_file_name(slot: &SlotId, original: Option<&str>) -> String {
    let ext = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{slot}.{ext}")
}

/// Recover the slot id from a stored file name by stripping its last extension.
/// Hidden files (temporaries included) belong to no slot.
pub fn slot_of_file(file_name: &str) -> Option<&str> {
    if file_name.starts_with('.') {
        return None;
    }
    let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
    (!stem.is_empty()).then_some(stem)
}

pub fn public_path(prefix: &str, file_name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), file_name)
}
