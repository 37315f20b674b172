use std::path::{Path, PathBuf};

use configs::DatabaseConfig;
use uuid::Uuid;

/// Unique scratch directory under the system temp dir (not created).
pub fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("site_admin_{label}_{}", Uuid::new_v4()))
}

/// SQLite file database inside `dir`, created on first connect.
pub fn sqlite_config(dir: &Path) -> DatabaseConfig {
    std::fs::create_dir_all(dir).expect("create sqlite dir");
    DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", dir.join("site.sqlite").display()),
        max_connections: 2,
        table_prefix: "test_".into(),
        ..DatabaseConfig::default()
    }
}

/// A configured database that can never be opened.
pub fn unreachable_config() -> DatabaseConfig {
    DatabaseConfig {
        url: "sqlite:///definitely/missing/dir/site.sqlite?mode=ro".into(),
        connect_timeout_secs: 1,
        acquire_timeout_secs: 1,
        ..DatabaseConfig::default()
    }
}
