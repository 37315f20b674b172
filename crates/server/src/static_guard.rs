//! Keeps private files out of the static file services.
//!
//! The site root often is the working directory, so it holds `.env`,
//! `config.toml` and the data directory next to the public pages. Any path
//! segment starting with `.` is hidden, and so is every configured private
//! path that lies under the served root.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct PrivatePaths {
    /// URL path segments of each private location, relative to the served root.
    prefixes: Vec<Vec<String>>,
}

impl PrivatePaths {
    /// Private entries of `private` that sit inside `root`; the rest are ignored.
    pub fn under(root: &Path, private: &[PathBuf]) -> Self {
        let root = absolute(root);
        let prefixes = private
            .iter()
            .filter_map(|p| absolute(p).strip_prefix(&root).ok().map(Path::to_path_buf))
            .map(|rel| {
                rel.components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            // the root itself stays public
            .filter(|segments| !segments.is_empty())
            .collect();
        Self { prefixes }
    }

    /// Whether a request path (still percent-encoded) must not be served.
    pub fn is_private(&self, request_path: &str) -> bool {
        let decoded = percent_decode_str(request_path).decode_utf8_lossy();
        let segments: Vec<&str> = decoded
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if segments.iter().any(|s| s.starts_with('.')) {
            return true;
        }
        self.prefixes.iter().any(|prefix| {
            segments.len() >= prefix.len() && prefix.iter().zip(&segments).all(|(a, b)| a.as_str() == *b)
        })
    }
}

/// Lexically absolute form of `path`, without touching the filesystem.
fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Middleware answering 404 for private paths before the file service sees them.
pub async fn hide_private(State(paths): State<Arc<PrivatePaths>>, req: Request, next: Next) -> Response {
    if paths.is_private(req.uri().path()) {
        debug!(path = %req.uri().path(), "refused private static path");
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(req).await
}
