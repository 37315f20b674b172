//! Create-if-missing schema for the prefixed `content` and `images` tables.
//!
//! Table names carry a runtime prefix, so the statements are built with
//! `sea_query` instead of static entities.
use sea_orm::sea_query::{Alias, ColumnDef, Table};
use sea_orm::{ConnectionTrait, DeriveIden};

use crate::errors::{db_err, ModelError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableNames {
    pub content: String,
    pub images: String,
}

impl TableNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            content: format!("{prefix}content"),
            images: format!("{prefix}images"),
        }
    }

    pub(crate) fn content_table(&self) -> Alias {
        Alias::new(self.content.as_str())
    }

    pub(crate) fn images_table(&self) -> Alias {
        Alias::new(self.images.as_str())
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self::with_prefix("site_")
    }
}

#[derive(DeriveIden, Clone, Copy)]
pub(crate) enum ContentColumn {
    ContentKey,
    ContentValue,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
pub(crate) enum ImageColumn {
    SlotId,
    FilePath,
    UpdatedAt,
}

/// Key columns are capped at 191 chars so utf8mb4 primary keys fit MySQL index limits.
pub const KEY_MAX_LEN: u32 = 191;

pub async fn ensure_tables<C: ConnectionTrait>(db: &C, names: &TableNames) -> Result<(), ModelError> {
    let backend = db.get_database_backend();

    let content = Table::create()
        .table(names.content_table())
        .if_not_exists()
        .col(
            ColumnDef::new(ContentColumn::ContentKey)
                .string_len(KEY_MAX_LEN)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(ContentColumn::ContentValue).text().null())
        .col(
            ColumnDef::new(ContentColumn::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned();
    db.execute(backend.build(&content)).await.map_err(db_err)?;

    let images = Table::create()
        .table(names.images_table())
        .if_not_exists()
        .col(
            ColumnDef::new(ImageColumn::SlotId)
                .string_len(KEY_MAX_LEN)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(ImageColumn::FilePath).string_len(512).not_null())
        .col(
            ColumnDef::new(ImageColumn::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned();
    db.execute(backend.build(&images)).await.map_err(db_err)?;

    Ok(())
}
