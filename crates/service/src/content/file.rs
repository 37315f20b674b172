use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::warn;

use super::{sanitize_content, ContentBackend, ContentMap, ContentSnapshot};
use crate::errors::ServiceError;
use crate::storage::json_document::JsonDocument;

/// Content persisted as `{ "content": {...}, "updatedAt": "..." }` in one JSON file.
pub struct FileContentBackend {
    doc: JsonDocument<Value>,
}

impl FileContentBackend {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { doc: JsonDocument::new(path) }
    }

    fn decode(value: &Value) -> ContentSnapshot {
        let content = value
            .get("content")
            .and_then(sanitize_content)
            .unwrap_or_default();
        let updated_at = value
            .get("updatedAt")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        ContentSnapshot { content, updated_at }
    }
}

#[async_trait]
impl ContentBackend for FileContentBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<ContentSnapshot, ServiceError> {
        match self.doc.read().await {
            Ok(Some(value)) => Ok(Self::decode(&value)),
            Ok(None) => Ok(ContentSnapshot::default()),
            Err(e) => {
                // 文件损坏时按空内容处理，下次保存会覆盖
                warn!(path = %self.doc.path().display(), error = %e, "unable to read content document; using empty payload");
                Ok(ContentSnapshot::default())
            }
        }
    }

    async fn save(&self, content: &ContentMap) -> Result<ContentSnapshot, ServiceError> {
        let now = Utc::now();
        let payload = json!({ "content": content, "updatedAt": now.to_rfc3339() });
        self.doc.write(&payload).await?;
        Ok(ContentSnapshot { content: content.clone(), updated_at: Some(now) })
    }
}
