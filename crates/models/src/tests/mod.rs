


use std::path::PathBuf;

use configs::DatabaseConfig;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::db::connect_with_config;
use crate::schema::{ensure_tables, TableNames};

/// Throwaway SQLite database file with the schema already created.
pub(crate) struct TestDb {
    pub db: DatabaseConnection,
    pub names: TableNames,
    pub path: PathBuf,
}

impl TestDb {
    pub async fn new() -> anyhow::Result<Self> {
        let path = std::env::temp_dir().join(format!("site_admin_models_{}.sqlite", Uuid::new_v4()));
        let cfg = DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            max_connections: 2,
            ..DatabaseConfig::default()
        };
        let db = connect_with_config(&cfg).await?;
        let names = TableNames::with_prefix("test_");
        ensure_tables(&db, &names).await?;
        Ok(Self { db, names, path })
    }

    pub async fn cleanup(self) {
        let _ = self.db.close().await;
        let _ = tokio::fs::remove_file(&self.path).await;
    }
}
