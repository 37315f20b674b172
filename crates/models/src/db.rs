use std::time::Duration;

use configs::DatabaseConfig;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tracing::info;

use crate::errors::{db_err, ModelError};

/// Open a pool using the configured limits. Fails fast when no URL is set.
pub async fn connect_with_config(cfg: &DatabaseConfig) -> Result<DatabaseConnection, ModelError> {
    if !cfg.is_enabled() {
        return Err(ModelError::Validation("database url is not configured".into()));
    }
    let mut opts = ConnectOptions::new(cfg.url.clone());
    opts.max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(cfg.max_lifetime_secs))
        .sqlx_logging(cfg.sqlx_logging);

    let db = Database::connect(opts).await.map_err(db_err)?;
    info!(backend = ?db.get_database_backend(), pool = cfg.max_connections, "database pool ready");
    Ok(db)
}

/// Round-trip a trivial query to check the pool is usable.
pub async fn ping<C: ConnectionTrait>(db: &C) -> Result<(), ModelError> {
    let backend = db.get_database_backend();
    db.query_one(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .map_err(db_err)?;
    Ok(())
}
