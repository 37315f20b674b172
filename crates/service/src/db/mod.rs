//! Lazily initialised relational handle shared by the content backend and the
//! image metadata mirror.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use configs::DatabaseConfig;
use models::schema::TableNames;
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::errors::ServiceError;

/// After a failed connect, further attempts are skipped for this long.
const RETRY_BACKOFF: Duration = Duration::from_secs(15);

pub struct DbHandle {
    cfg: DatabaseConfig,
    names: TableNames,
    conn: OnceCell<DatabaseConnection>,
    retry_after: Mutex<Option<Instant>>,
}

impl DbHandle {
    pub fn new(cfg: DatabaseConfig) -> Self {
        let names = TableNames::with_prefix(&cfg.table_prefix);
        Self { cfg, names, conn: OnceCell::new(), retry_after: Mutex::new(None) }
    }

    pub fn names(&self) -> &TableNames {
        &self.names
    }

    /// Connect and create tables on first use. A failure is not cached, but
    /// retries are throttled so a dead database does not stall every request.
    pub async fn connection(&self) -> Result<&DatabaseConnection, ServiceError> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn);
        }
        if let Some(until) = self.backoff_until() {
            if Instant::now() < until {
                return Err(ServiceError::BackendUnavailable(
                    "database unavailable; waiting before reconnecting".into(),
                ));
            }
        }

        let res = self
            .conn
            .get_or_try_init(|| async {
                let db = models::db::connect_with_config(&self.cfg).await?;
                models::db::ping(&db).await?;
                models::schema::ensure_tables(&db, &self.names).await?;
                info!(content = %self.names.content, images = %self.names.images, "database tables ready");
                Ok::<_, models::errors::ModelError>(db)
            })
            .await;

        match res {
            Ok(conn) => Ok(conn),
            Err(e) => {
                warn!(error = %e, "database initialisation failed");
                self.set_backoff(Instant::now() + RETRY_BACKOFF);
                Err(ServiceError::BackendUnavailable(e.to_string()))
            }
        }
    }

    fn backoff_until(&self) -> Option<Instant> {
        self.retry_after.lock().map(|g| *g).unwrap_or(None)
    }

    fn set_backoff(&self, until: Instant) {
        if let Ok(mut g) = self.retry_after.lock() {
            *g = Some(until);
        }
    }
}
