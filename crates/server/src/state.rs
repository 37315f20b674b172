use std::path::PathBuf;
use std::sync::Arc;

use service::content::ContentStore;
use service::images::ImageStore;

use crate::static_guard::PrivatePaths;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentStore>,
    pub images: Arc<ImageStore>,
    pub upload_dir: PathBuf,
    pub site_root: PathBuf,
    pub public_upload_path: String,
    /// Locations under `site_root` the static fallback must never serve.
    pub private_paths: Arc<PrivatePaths>,
}
