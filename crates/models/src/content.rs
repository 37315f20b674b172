use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::warn;

use crate::errors::{db_err, ModelError};
use crate::schema::{ContentColumn, TableNames};

/// Rows per INSERT statement. Three binds per row keeps each statement
/// under the smallest parameter limit of the supported backends (SQLite 999).
pub const INSERT_BATCH_ROWS: usize = 300;

#[derive(Clone, Debug, PartialEq)]
pub struct ContentRow {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Read every content row. A NULL value is returned as an empty string.
pub async fn load_all<C: ConnectionTrait>(db: &C, names: &TableNames) -> Result<Vec<ContentRow>, ModelError> {
    let stmt = Query::select()
        .columns([
            ContentColumn::ContentKey,
            ContentColumn::ContentValue,
            ContentColumn::UpdatedAt,
        ])
        .from(names.content_table())
        .to_owned();
    let rows = db
        .query_all(db.get_database_backend().build(&stmt))
        .await
        .map_err(db_err)?;

    rows.into_iter()
        .map(|row| {
            Ok(ContentRow {
                key: row.try_get("", "content_key").map_err(db_err)?,
                value: row
                    .try_get::<Option<String>>("", "content_value")
                    .map_err(db_err)?
                    .unwrap_or_default(),
                updated_at: row.try_get("", "updated_at").map_err(db_err)?,
            })
        })
        .collect()
}

/// Replace the whole table with `entries` inside one transaction.
///
/// On any failure the transaction is rolled back and the original error is returned.
pub async fn replace_all(
    db: &DatabaseConnection,
    names: &TableNames,
    entries: &BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> Result<(), ModelError> {
    let txn = db.begin().await.map_err(db_err)?;
    match write_entries(&txn, names, entries, now).await {
        Ok(()) => txn.commit().await.map_err(db_err),
        Err(e) => {
            if let Err(rb) = txn.rollback().await {
                warn!(error = %rb, "content rollback failed");
            }
            Err(e)
        }
    }
}

async fn write_entries<C: ConnectionTrait>(
    conn: &C,
    names: &TableNames,
    entries: &BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> Result<(), ModelError> {
    let backend = conn.get_database_backend();

    let delete = Query::delete().from_table(names.content_table()).to_owned();
    conn.execute(backend.build(&delete)).await.map_err(db_err)?;

    let rows: Vec<_> = entries.iter().collect();
    for chunk in rows.chunks(INSERT_BATCH_ROWS) {
        let mut insert = Query::insert()
            .into_table(names.content_table())
            .columns([
                ContentColumn::ContentKey,
                ContentColumn::ContentValue,
                ContentColumn::UpdatedAt,
            ])
            .to_owned();
        for (key, value) in chunk {
            insert
                .values([(*key).clone().into(), (*value).clone().into(), now.into()])
                .map_err(|e| ModelError::Db(e.to_string()))?;
        }
        conn.execute(backend.build(&insert)).await.map_err(db_err)?;
    }
    Ok(())
}
