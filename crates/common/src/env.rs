//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::warn;

/// Create the data and upload directories; warn when the site root is missing.
pub async fn ensure_env(site_root: &Path, data_dir: &Path, upload_dir: &Path) -> anyhow::Result<()> {
    if tokio::fs::metadata(site_root).await.is_err() {
        warn!(site_root = %site_root.display(), "site root not found; static pages may 404");
    }
    for dir in [data_dir, upload_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_env_creates_missing_dirs() -> anyhow::Result<()> {
        let root = std::env::temp_dir().join(format!("site_admin_env_{}", uuid::Uuid::new_v4()));
        let data = root.join("data");
        let uploads = root.join("assets").join("uploads");

        ensure_env(&root.join("missing-site"), &data, &uploads).await?;
        assert!(tokio::fs::metadata(&data).await?.is_dir());
        assert!(tokio::fs::metadata(&uploads).await?.is_dir());

        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }
}
