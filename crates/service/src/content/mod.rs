//! Site text content: a flat `key -> string` map persisted as a whole.
//!
//! [`ContentStore`] fronts a ranked list of [`ContentBackend`]s and keeps the
//! last snapshot in memory.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::ServiceError;

pub mod db;
pub mod file;
pub mod store;

pub use db::DbContentBackend;
pub use file::FileContentBackend;
pub use store::{ContentRead, ContentStore};

pub type ContentMap = BTreeMap<String, String>;

/// A full content map plus the time it was last written, if ever.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentSnapshot {
    pub content: ContentMap,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<ContentSnapshot, ServiceError>;
    /// Replace everything with `content` and return what is now stored.
    async fn save(&self, content: &ContentMap) -> Result<ContentSnapshot, ServiceError>;
}

/// Keep only the string-valued fields of a JSON object.
///
/// Returns `None` when `value` is not an object (arrays and null included).
pub fn sanitize_content(value: &Value) -> Option<ContentMap> {
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
    )
}
