use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::{ContentBackend, ContentMap, ContentSnapshot};
use crate::db::DbHandle;
use crate::errors::ServiceError;

/// Content rows in `<prefix>content`, replaced transactionally on save.
pub struct DbContentBackend {
    handle: Arc<DbHandle>,
}

impl DbContentBackend {
    pub fn new(handle: Arc<DbHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl ContentBackend for DbContentBackend {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn load(&self) -> Result<ContentSnapshot, ServiceError> {
        let conn = self.handle.connection().await?;
        let rows = models::content::load_all(conn, self.handle.names()).await?;

        let updated_at = rows.iter().map(|r| r.updated_at).max();
        let content = rows.into_iter().map(|r| (r.key, r.value)).collect();
        Ok(ContentSnapshot { content, updated_at })
    }

    async fn save(&self, content: &ContentMap) -> Result<ContentSnapshot, ServiceError> {
        let conn = self.handle.connection().await?;
        models::content::replace_all(conn, self.handle.names(), content, Utc::now()).await?;
        self.load().await
    }
}
