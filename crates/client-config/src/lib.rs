//! Admin page bootstrap: decide where the admin API and uploaded images live.
//!
//! Runs once per page load. Stored settings are merged with query-string
//! overrides, missing values are inferred from the page location, and the
//! result is persisted and published to process-wide [`Globals`].

pub mod globals;
pub mod storage;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

pub use globals::{Globals, GLOBALS};
pub use storage::{ConfigStorage, FileStorage, MemoryStorage, StorageError};

/// Key under which the resolved config is persisted.
pub const STORAGE_KEY: &str = "site_admin_config";
/// Backend origin assumed when the page cannot reach one of its own.
pub const FALLBACK_ORIGIN: &str = "http://localhost:4000";
/// Static hosts that never run the admin backend.
pub const HOSTED_DOMAINS: [&str; 5] = [
    "github.io",
    "githubusercontent.com",
    "netlify.app",
    "pages.dev",
    "vercel.app",
];

const API_SUFFIX: &str = "/api";
const UPLOADS_SUFFIX: &str = "/assets/uploads";

/// Partially known settings, as stored or passed in the query string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_root: Option<String>,
}

/// Fully resolved settings. `image_root` may be empty when it cannot be derived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfig {
    pub api_base: String,
    pub image_root: String,
}

#[derive(Clone, Debug)]
pub struct BootstrapOptions {
    pub storage_key: String,
    pub fallback_origin: String,
    pub hosted_domains: Vec<String>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            fallback_origin: FALLBACK_ORIGIN.to_string(),
            hosted_domains: HOSTED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Page-load entry point: [`bootstrap`] with default options, publishing to [`GLOBALS`].
pub fn bootstrap_global(location: &Url, storage: &dyn ConfigStorage) -> AdminConfig {
    bootstrap(location, storage, &GLOBALS, &BootstrapOptions::default())
}

/// Resolve, persist and publish the admin config for a page at `location`.
/// Storage failures are logged and otherwise ignored.
pub fn bootstrap(
    location: &Url,
    storage: &dyn ConfigStorage,
    globals: &Globals,
    options: &BootstrapOptions,
) -> AdminConfig {
    if query_param(location, "resetConfig").as_deref() == Some("1") {
        if let Err(e) = storage.remove(&options.storage_key) {
            warn!(error = %e, "could not clear stored admin config");
        }
    }

    let stored = read_stored(storage, &options.storage_key);
    let merged = StoredConfig {
        api_base: query_param(location, "api").or(stored.api_base).filter(|v| !v.is_empty()),
        image_root: query_param(location, "images").or(stored.image_root).filter(|v| !v.is_empty()),
    };

    let api_base = merged
        .api_base
        .unwrap_or_else(|| infer_api_base(location, options));
    let image_root = merged
        .image_root
        .unwrap_or_else(|| derive_image_root(&api_base));
    let config = AdminConfig { api_base, image_root };

    match serde_json::to_string(&config) {
        Ok(raw) => {
            if let Err(e) = storage.set(&options.storage_key, &raw) {
                warn!(error = %e, "could not persist admin config");
            }
        }
        Err(e) => warn!(error = %e, "could not encode admin config"),
    }

    globals.publish(&config);
    debug!(api_base = %config.api_base, image_root = %config.image_root, "admin config resolved");
    config
}

/// Value of the first `name` pair in the query string; `None` when absent or empty.
fn query_param(location: &Url, name: &str) -> Option<String> {
    location
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn read_stored(storage: &dyn ConfigStorage, key: &str) -> StoredConfig {
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return StoredConfig::default(),
        Err(e) => {
            warn!(error = %e, "stored admin config unreadable");
            return StoredConfig::default();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "stored admin config is not valid JSON; ignoring");
        StoredConfig::default()
    })
}

/// True when the page is served from somewhere that cannot host the backend:
/// a local file, a host-less URL, or a known static hosting domain.
pub fn is_hosted_without_backend(location: &Url, hosted_domains: &[String]) -> bool {
    if location.scheme() == "file" {
        return true;
    }
    let host = match location.host_str() {
        Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
        _ => return true,
    };
    if host == "localhost" || host == "127.0.0.1" {
        return false;
    }
    hosted_domains.iter().any(|domain| {
        let domain = domain.to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    })
}

fn infer_api_base(location: &Url, options: &BootstrapOptions) -> String {
    if is_hosted_without_backend(location, &options.hosted_domains) {
        return format!("{}{API_SUFFIX}", options.fallback_origin.trim_end_matches('/'));
    }
    let origin = location.origin();
    let origin = if origin.is_tuple() {
        origin.ascii_serialization()
    } else {
        options.fallback_origin.clone()
    };
    format!("{}{API_SUFFIX}", origin.trim_end_matches('/'))
}

/// `.../api` -> `.../assets/uploads`; anything else has no conventional image root.
pub fn derive_image_root(api_base: &str) -> String {
    api_base
        .strip_suffix(API_SUFFIX)
        .map(|base| format!("{base}{UPLOADS_SUFFIX}"))
        .unwrap_or_default()
}
