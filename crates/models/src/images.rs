use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::ConnectionTrait;

use crate::errors::{db_err, ModelError};
use crate::schema::{ImageColumn, TableNames};

#[derive(Clone, Debug, PartialEq)]
pub struct ImageRow {
    pub slot_id: String,
    pub file_path: String,
    pub updated_at: DateTime<Utc>,
}

pub async fn list_all<C: ConnectionTrait>(db: &C, names: &TableNames) -> Result<Vec<ImageRow>, ModelError> {
    let stmt = Query::select()
        .columns([ImageColumn::SlotId, ImageColumn::FilePath, ImageColumn::UpdatedAt])
        .from(names.images_table())
        .to_owned();
    let rows = db
        .query_all(db.get_database_backend().build(&stmt))
        .await
        .map_err(db_err)?;

    rows.into_iter()
        .map(|row| {
            Ok(ImageRow {
                slot_id: row.try_get("", "slot_id").map_err(db_err)?,
                file_path: row.try_get("", "file_path").map_err(db_err)?,
                updated_at: row.try_get("", "updated_at").map_err(db_err)?,
            })
        })
        .collect()
}

/// Insert or replace the row for `slot_id`.
pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    names: &TableNames,
    slot_id: &str,
    file_path: &str,
    now: DateTime<Utc>,
) -> Result<(), ModelError> {
    if slot_id.trim().is_empty() {
        return Err(ModelError::Validation("slot_id required".into()));
    }
    let stmt = Query::insert()
        .into_table(names.images_table())
        .columns([ImageColumn::SlotId, ImageColumn::FilePath, ImageColumn::UpdatedAt])
        .values([slot_id.into(), file_path.into(), now.into()])
        .map_err(|e| ModelError::Db(e.to_string()))?
        .on_conflict(
            OnConflict::column(ImageColumn::SlotId)
                .update_columns([ImageColumn::FilePath, ImageColumn::UpdatedAt])
                .to_owned(),
        )
        .to_owned();
    db.execute(db.get_database_backend().build(&stmt))
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Delete the row for `slot_id`; returns whether a row existed.
pub async fn delete<C: ConnectionTrait>(db: &C, names: &TableNames, slot_id: &str) -> Result<bool, ModelError> {
    let stmt = Query::delete()
        .from_table(names.images_table())
        .and_where(Expr::col(ImageColumn::SlotId).eq(slot_id))
        .to_owned();
    let res = db
        .execute(db.get_database_backend().build(&stmt))
        .await
        .map_err(db_err)?;
    Ok(res.rows_affected() > 0)
}
