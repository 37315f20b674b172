//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so the server crate can prepare the
//! storage layout without depending directly on `common`.

use configs::StorageConfig;

/// Ensure the data and upload directories exist; warn on a missing site root.
pub async fn ensure_env(storage: &StorageConfig) -> anyhow::Result<()> {
    common::env::ensure_env(&storage.site_root, &storage.data_dir, &storage.upload_dir).await
}
