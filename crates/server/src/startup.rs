use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::Router;
use configs::AppConfig;
use dotenvy::dotenv;
use service::{
    content::{ContentBackend, ContentStore, DbContentBackend, FileContentBackend},
    db::DbHandle,
    images::{DbImageMirror, FsImageBackend, ImageStore},
    runtime,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;
use crate::static_guard::PrivatePaths;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Wire the stores from configuration. The database backend is used only
/// when a URL is configured; it connects lazily on first request.
pub fn build_state(cfg: &AppConfig) -> Result<AppState, StartupError> {
    let storage = &cfg.storage;
    let db = cfg
        .database
        .is_enabled()
        .then(|| Arc::new(DbHandle::new(cfg.database.clone())));

    let mut backends: Vec<Arc<dyn ContentBackend>> = Vec::new();
    if let Some(handle) = &db {
        backends.push(Arc::new(DbContentBackend::new(Arc::clone(handle))));
    }
    backends.push(Arc::new(FileContentBackend::new(storage.content_file())));
    let content = ContentStore::new(backends);

    let max_size = usize::try_from(storage.max_image_size).unwrap_or(usize::MAX);
    let fs = Arc::new(FsImageBackend::new(&storage.upload_dir, storage.public_upload_path.clone()));
    let mut images = ImageStore::new(fs, storage.public_upload_path.clone(), max_size)
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    if let Some(handle) = db {
        images = images
            .with_mirror(Arc::new(DbImageMirror::new(handle)))
            .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    }

    info!(
        service = "server",
        event = "stores_ready",
        content_backends = ?content.backend_names(),
        upload_dir = %storage.upload_dir.display(),
        max_image_size = max_size,
        "storage configured"
    );

    let private_paths = PrivatePaths::under(
        &storage.site_root,
        &[
            storage.data_dir.clone(),
            storage.content_file(),
            PathBuf::from(configs::config_path()),
        ],
    );

    Ok(AppState {
        content: Arc::new(content),
        images: Arc::new(images),
        upload_dir: storage.upload_dir.clone(),
        site_root: storage.site_root.clone(),
        public_upload_path: storage.public_upload_path.clone(),
        private_paths: Arc::new(private_paths),
    })
}

/// Build the router for an already-validated configuration.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    runtime::ensure_env(&cfg.storage)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;
    let state = build_state(cfg)?;
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: load configuration, build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    run_with_config(cfg).await
}

pub async fn run_with_config(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let listener = tokio::net::TcpListener::bind((cfg.server.host.as_str(), cfg.server.port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!(service = "server", event = "listen", %addr, "admin backend listening");
    axum::serve(listener, app).await?;
    Ok(())
}
