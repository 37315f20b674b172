//! Key-value persistence for the resolved config between page loads.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid storage document: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait ConfigStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage, lost with the process.
#[derive(Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A JSON object of `key -> string` on disk. Missing file reads as empty.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl ConfigStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // a corrupt document is replaced rather than blocking every write
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bootstrap, BootstrapOptions, Globals, STORAGE_KEY};

    fn temp_file() -> PathBuf {
        std::env::temp_dir()
            .join(format!("site_admin_client_{}", uuid::Uuid::new_v4()))
            .join("storage.json")
    }

    #[test]
    fn file_storage_persists_across_instances() -> Result<(), StorageError> {
        let path = temp_file();
        let first = FileStorage::new(&path);
        assert_eq!(first.get("k")?, None);
        first.set("k", "v")?;
        first.set("other", "w")?;

        let second = FileStorage::new(&path);
        assert_eq!(second.get("k")?.as_deref(), Some("v"));
        second.remove("k")?;
        assert_eq!(FileStorage::new(&path).get("k")?, None);
        assert_eq!(FileStorage::new(&path).get("other")?.as_deref(), Some("w"));

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
        Ok(())
    }

    #[test]
    fn bootstrap_result_is_reused_on_next_visit() {
        let path = temp_file();
        let url = url::Url::parse("https://site.example/admin?images=https://cdn.example/u").unwrap();
        let first = bootstrap(&url, &FileStorage::new(&path), &Globals::new(), &BootstrapOptions::default());

        let plain = url::Url::parse("https://site.example/admin").unwrap();
        let second = bootstrap(&plain, &FileStorage::new(&path), &Globals::new(), &BootstrapOptions::default());
        assert_eq!(second, first);
        assert_eq!(second.image_root, "https://cdn.example/u");
        assert!(FileStorage::new(&path).get(STORAGE_KEY).unwrap().is_some());

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
