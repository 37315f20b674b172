use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{public_path, slot_of_file, Capability, ImageBackend, ImageMap, PreparedImage, SlotId};
use crate::errors::ServiceError;

/// Upload directory holding one `<slot>.<ext>` file per slot. Authoritative.
pub struct FsImageBackend {
    dir: PathBuf,
    public_prefix: String,
}

impl FsImageBackend {
    pub fn new<P: Into<PathBuf>>(dir: P, public_prefix: impl Into<String>) -> Self {
        Self { dir: dir.into(), public_prefix: public_prefix.into() }
    }

    /// Names of the regular files in the upload directory. A missing directory is empty.
    async fn file_names(&self) -> Result<Vec<String>, ServiceError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ServiceError::storage(e)),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ServiceError::storage)? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn remove_slot_files(&self, slot: &SlotId) -> Result<(), ServiceError> {
        for name in self.file_names().await? {
            if slot_of_file(&name) != Some(slot.as_str()) {
                continue;
            }
            match fs::remove_file(self.dir.join(&name)).await {
                Ok(()) => debug!(slot_id = %slot, file = %name, "removed slot file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(ServiceError::storage(e)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ImageBackend for FsImageBackend {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn capability(&self) -> Capability {
        Capability::Authoritative
    }

    async fn list(&self) -> Result<ImageMap, ServiceError> {
        let mut names = self.file_names().await?;
        names.sort();
        let map = names
            .iter()
            .filter_map(|name| {
                slot_of_file(name).map(|slot| (slot.to_string(), public_path(&self.public_prefix, name)))
            })
            .collect();
        Ok(map)
    }

    async fn put(&self, image: &PreparedImage) -> Result<(), ServiceError> {
        fs::create_dir_all(&self.dir).await.map_err(ServiceError::storage)?;
        self.remove_slot_files(&image.slot).await?;

        // Hidden temp name: never listed, never matched as a slot file.
        let tmp = self.dir.join(format!(".{}.{}.tmp", image.file_name, uuid::Uuid::new_v4()));
        fs::write(&tmp, &image.bytes).await.map_err(ServiceError::storage)?;
        if let Err(e) = fs::rename(&tmp, self.dir.join(&image.file_name)).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServiceError::storage(e));
        }
        Ok(())
    }

    async fn delete(&self, slot: &SlotId) -> Result<(), ServiceError> {
        self.remove_slot_files(slot).await
    }
}
