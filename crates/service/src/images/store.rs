use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::{
    image_file_name, public_path, Capability, ImageBackend, ImageMap, PreparedImage, SlotId,
};
use crate::errors::{RejectReason, ServiceError};
use crate::observability::{MIRROR_FAILURES_TOTAL, UPLOADS_REJECTED_TOTAL};

/// Raw upload as received from the client.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

/// Image slots over one authoritative backend and any number of mirrors.
pub struct ImageStore {
    primary: Arc<dyn ImageBackend>,
    mirrors: Vec<Arc<dyn ImageBackend>>,
    public_prefix: String,
    max_size: usize,
    slot_locks: DashMap<SlotId, Arc<Mutex<()>>>,
}

impl ImageStore {
    pub fn new(
        primary: Arc<dyn ImageBackend>,
        public_prefix: impl Into<String>,
        max_size: usize,
    ) -> Result<Self, ServiceError> {
        if primary.capability() != Capability::Authoritative {
            return Err(ServiceError::Storage(format!(
                "image backend `{}` is not authoritative",
                primary.name()
            )));
        }
        Ok(Self {
            primary,
            mirrors: Vec::new(),
            public_prefix: public_prefix.into(),
            max_size,
            slot_locks: DashMap::new(),
        })
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn ImageBackend>) -> Result<Self, ServiceError> {
        if mirror.capability() != Capability::Mirror {
            return Err(ServiceError::Storage(format!(
                "image backend `{}` cannot be used as a mirror",
                mirror.name()
            )));
        }
        self.mirrors.push(mirror);
        Ok(self)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub async fn list(&self) -> Result<ImageMap, ServiceError> {
        let err = match self.primary.list().await {
            Ok(map) => return Ok(map),
            Err(e) => e,
        };
        warn!(backend = self.primary.name(), error = %err, "image listing failed; trying mirrors");
        for mirror in &self.mirrors {
            match mirror.list().await {
                Ok(map) if !map.is_empty() => return Ok(map),
                Ok(_) => {}
                Err(e) => self.note_mirror_failure(mirror.as_ref(), "list", &e),
            }
        }
        Err(err)
    }

    /// Validate and store an upload, replacing whatever the slot held.
    /// Returns the public path of the stored file.
    pub async fn put(&self, slot: &SlotId, upload: ImageUpload) -> Result<String, ServiceError> {
        let is_image = upload
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"));
        if !is_image {
            return Err(self.reject(RejectReason::UnsupportedType, "Only image uploads are allowed.".into()));
        }
        if upload.bytes.len() > self.max_size {
            return Err(self.reject(
                RejectReason::TooLarge,
                format!("Image exceeds the {} byte limit.", self.max_size),
            ));
        }

        let file_name = image_file_name(slot, upload.file_name.as_deref());
        let image = PreparedImage {
            slot: slot.clone(),
            public_path: public_path(&self.public_prefix, &file_name),
            file_name,
            bytes: upload.bytes,
        };

        let lease = self.lease(slot);
        let _guard = lease.lock().await;
        self.primary.put(&image).await?;
        for mirror in &self.mirrors {
            if let Err(e) = mirror.put(&image).await {
                self.note_mirror_failure(mirror.as_ref(), "put", &e);
            }
        }
        info!(slot_id = %slot, file = %image.file_name, size = image.bytes.len(), "image stored");
        Ok(image.public_path)
    }

    pub async fn delete(&self, slot: &SlotId) -> Result<(), ServiceError> {
        let lease = self.lease(slot);
        let _guard = lease.lock().await;
        self.primary.delete(slot).await?;
        for mirror in &self.mirrors {
            if let Err(e) = mirror.delete(slot).await {
                self.note_mirror_failure(mirror.as_ref(), "delete", &e);
            }
        }
        info!(slot_id = %slot, "image removed");
        Ok(())
    }

    fn lease(&self, slot: &SlotId) -> SlotLease<'_> {
        let lock = self.slot_locks.entry(slot.clone()).or_default().clone();
        SlotLease { locks: &self.slot_locks, slot: slot.clone(), lock }
    }

    /// Slots with an operation in flight or waiting.
    pub fn busy_slots(&self) -> usize {
        self.slot_locks.len()
    }

    fn reject(&self, reason: RejectReason, message: String) -> ServiceError {
        UPLOADS_REJECTED_TOTAL.with_label_values(&[reason.as_str()]).inc();
        ServiceError::rejected(reason, message)
    }

    fn note_mirror_failure(&self, mirror: &dyn ImageBackend, op: &'static str, e: &ServiceError) {
        warn!(mirror = mirror.name(), op, error = %e, "image mirror out of sync");
        MIRROR_FAILURES_TOTAL.with_label_values(&[mirror.name()]).inc();
    }
}

/// Holds a slot's lock entry; the entry leaves the map with the last lease.
struct SlotLease<'a> {
    locks: &'a DashMap<SlotId, Arc<Mutex<()>>>,
    slot: SlotId,
    lock: Arc<Mutex<()>>,
}

impl SlotLease<'_> {
    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        // new leases clone under the shard lock held by remove_if, so the count
        // cannot grow while it is checked: 2 is the map plus this lease
        self.locks.remove_if(&self.slot, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbHandle;
    use crate::images::{DbImageMirror, FsImageBackend};
    use crate::test_support::{sqlite_config, temp_path, unreachable_config};
    use std::path::Path;

    const PREFIX: &str = "/assets/uploads";

    fn png(bytes: &[u8], name: &str) -> ImageUpload {
        ImageUpload {
            bytes: bytes.to_vec(),
            file_name: Some(name.to_string()),
            content_type: Some("image/png".into()),
        }
    }

    fn slot(id: &str) -> SlotId {
        SlotId::parse(id).unwrap()
    }

    fn fs_store(dir: &Path, max: usize) -> ImageStore {
        ImageStore::new(Arc::new(FsImageBackend::new(dir, PREFIX)), PREFIX, max).unwrap()
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|rd| rd.filter_map(|e| e.ok()).filter_map(|e| e.file_name().into_string().ok()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    #[tokio::test]
    async fn put_replaces_previous_file_of_slot() -> Result<(), anyhow::Error> {
        let dir = temp_path("images");
        let store = fs_store(&dir, 1024);

        let first = store.put(&slot("hero"), png(b"one", "a.PNG")).await?;
        assert_eq!(first, "/assets/uploads/hero.png");
        let second = store.put(&slot("hero"), png(b"two", "b.jpg")).await?;
        assert_eq!(second, "/assets/uploads/hero.jpg");

        assert_eq!(files_in(&dir), vec!["hero.jpg".to_string()]);
        assert_eq!(std::fs::read(dir.join("hero.jpg"))?, b"two");

        let listed = store.list().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.get("hero").map(String::as_str), Some("/assets/uploads/hero.jpg"));

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn slots_sharing_a_prefix_are_independent() -> Result<(), anyhow::Error> {
        let dir = temp_path("images");
        let store = fs_store(&dir, 1024);

        store.put(&slot("hero"), png(b"a", "a.png")).await?;
        store.put(&slot("hero.v2"), png(b"b", "b.png")).await?;
        store.put(&slot("hero-alt"), png(b"c", "c.png")).await?;
        store.delete(&slot("hero")).await?;

        assert_eq!(files_in(&dir), vec!["hero-alt.png".to_string(), "hero.v2.png".to_string()]);
        let listed = store.list().await?;
        assert!(listed.contains_key("hero.v2"));
        assert!(listed.contains_key("hero-alt"));
        assert!(!listed.contains_key("hero"));

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_non_images_and_oversize() -> Result<(), anyhow::Error> {
        let dir = temp_path("images");
        let store = fs_store(&dir, 4);

        let mut text = png(b"hi", "notes.txt");
        text.content_type = Some("text/plain".into());
        let err = store.put(&slot("doc"), text).await.unwrap_err();
        assert!(matches!(err, ServiceError::UploadRejected { reason: RejectReason::UnsupportedType, .. }));

        let mut untyped = png(b"hi", "x.png");
        untyped.content_type = None;
        assert!(store.put(&slot("doc"), untyped).await.is_err());

        // exactly at the ceiling is accepted
        store.put(&slot("ok"), png(b"1234", "ok.png")).await?;
        let err = store.put(&slot("big"), png(b"12345", "big.png")).await.unwrap_err();
        assert!(matches!(err, ServiceError::UploadRejected { reason: RejectReason::TooLarge, .. }));

        assert_eq!(files_in(&dir), vec!["ok.png".to_string()]);
        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn missing_upload_dir_lists_empty_and_delete_is_noop() -> Result<(), anyhow::Error> {
        let dir = temp_path("images");
        let store = fs_store(&dir, 1024);
        assert!(store.list().await?.is_empty());
        store.delete(&slot("nothing")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn hidden_files_are_not_slots() -> Result<(), anyhow::Error> {
        let dir = temp_path("images");
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(".gitkeep"), b"")?;
        std::fs::create_dir_all(dir.join("nested.dir"))?;
        let store = fs_store(&dir, 1024);
        assert!(store.list().await?.is_empty());
        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn database_mirror_tracks_puts_and_deletes() -> Result<(), anyhow::Error> {
        let dir = temp_path("images");
        let handle = Arc::new(DbHandle::new(sqlite_config(&dir.join("db"))));
        let uploads = dir.join("uploads");
        let store = fs_store(&uploads, 1024).with_mirror(Arc::new(DbImageMirror::new(handle.clone())))?;

        store.put(&slot("logo"), png(b"x", "logo.svg")).await?;
        let mirror = DbImageMirror::new(handle.clone());
        let rows = mirror.list().await?;
        assert_eq!(rows.get("logo").map(String::as_str), Some("/assets/uploads/logo.svg"));

        store.delete(&slot("logo")).await?;
        assert!(mirror.list().await?.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn failing_mirror_never_fails_the_write() -> Result<(), anyhow::Error> {
        let dir = temp_path("images");
        let handle = Arc::new(DbHandle::new(unreachable_config()));
        let store = fs_store(&dir, 1024).with_mirror(Arc::new(DbImageMirror::new(handle)))?;

        let path = store.put(&slot("hero"), png(b"x", "h.png")).await?;
        assert_eq!(path, "/assets/uploads/hero.png");
        store.delete(&slot("hero")).await?;
        assert!(store.list().await?.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn capabilities_are_checked_at_construction() {
        let dir = temp_path("images");
        let handle = Arc::new(DbHandle::new(unreachable_config()));
        let mirror: Arc<dyn ImageBackend> = Arc::new(DbImageMirror::new(handle));
        assert!(ImageStore::new(mirror, PREFIX, 1).is_err());

        let fs: Arc<dyn ImageBackend> = Arc::new(FsImageBackend::new(&dir, PREFIX));
        let store = fs_store(&dir, 1);
        assert!(store.with_mirror(fs).is_err());
    }

    #[tokio::test]
    async fn concurrent_puts_to_one_slot_leave_one_file() -> Result<(), anyhow::Error> {
        let dir = temp_path("images");
        let store = Arc::new(fs_store(&dir, 1024));
        let mut tasks = Vec::new();
        for (i, ext) in ["png", "jpg", "gif", "webp", "avif", "bmp"].iter().enumerate() {
            let store = store.clone();
            let name = format!("f{i}.{ext}");
            tasks.push(tokio::spawn(async move { store.put(&slot("banner"), png(b"z", &name)).await }));
        }
        for t in tasks {
            t.await??;
        }
        let files = files_in(&dir);
        assert_eq!(files.len(), 1, "{files:?}");
        assert!(files[0].starts_with("banner."));
        assert_eq!(store.busy_slots(), 0);
        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[tokio::test]
    async fn slot_locks_are_released_after_use() -> Result<(), anyhow::Error> {
        let dir = temp_path("images");
        let store = Arc::new(fs_store(&dir, 4));

        for i in 0..200 {
            store.delete(&slot(&format!("ghost-{i}"))).await?;
        }
        store.put(&slot("hero"), png(b"x", "h.png")).await?;
        // failed uploads release their slot as well
        assert!(store.put(&slot("big"), png(b"12345", "b.png")).await.is_err());
        assert!(store.put(&slot("hero"), png(b"x", "h.png")).await.is_ok());
        assert_eq!(store.busy_slots(), 0);

        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move { store.delete(&slot(&format!("s{}", i % 5))).await }));
        }
        for t in tasks {
            t.await??;
        }
        assert_eq!(store.busy_slots(), 0);

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }
}
