use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::{Capability, ImageBackend, ImageMap, PreparedImage, SlotId};
use crate::db::DbHandle;
use crate::errors::ServiceError;

/// `slot_id -> file_path` rows in `<prefix>images`, mirrored from the filesystem.
pub struct DbImageMirror {
    handle: Arc<DbHandle>,
}

impl DbImageMirror {
    pub fn new(handle: Arc<DbHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl ImageBackend for DbImageMirror {
    fn name(&self) -> &'static str {
        "database"
    }

    fn capability(&self) -> Capability {
        Capability::Mirror
    }

    async fn list(&self) -> Result<ImageMap, ServiceError> {
        let conn = self.handle.connection().await?;
        let rows = models::images::list_all(conn, self.handle.names()).await?;
        Ok(rows.into_iter().map(|r| (r.slot_id, r.file_path)).collect())
    }

    async fn put(&self, image: &PreparedImage) -> Result<(), ServiceError> {
        let conn = self.handle.connection().await?;
        models::images::upsert(conn, self.handle.names(), image.slot.as_str(), &image.public_path, Utc::now()).await?;
        Ok(())
    }

    async fn delete(&self, slot: &SlotId) -> Result<(), ServiceError> {
        let conn = self.handle.connection().await?;
        models::images::delete(conn, self.handle.names(), slot.as_str()).await?;
        Ok(())
    }
}
