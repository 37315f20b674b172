use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use arc_swap::ArcSwapOption;
use tracing::{debug, warn};

use super::{ContentBackend, ContentMap, ContentSnapshot};
use crate::errors::ServiceError;
use crate::observability::{BACKEND_FAILURES_TOTAL, CONTENT_SERVED_TOTAL};

/// Result of a content read or write.
#[derive(Clone, Debug)]
pub struct ContentRead {
    pub snapshot: ContentSnapshot,
    /// Name of the backend that produced the snapshot.
    pub served_by: &'static str,
    /// Bumped on every successful write; reads report the generation they observed.
    pub generation: u64,
    pub from_cache: bool,
}

#[derive(Debug)]
struct CachedContent {
    snapshot: ContentSnapshot,
    served_by: &'static str,
    generation: u64,
}

/// Content access over a ranked list of backends, preferred first.
///
/// Each call tries the backends in order and returns the first success; a
/// failing backend is logged and skipped. The last successful snapshot is kept
/// in memory and serves reads until the next write.
pub struct ContentStore {
    backends: Vec<Arc<dyn ContentBackend>>,
    cache: ArcSwapOption<CachedContent>,
    generation: AtomicU64,
}

impl ContentStore {
    pub fn new(backends: Vec<Arc<dyn ContentBackend>>) -> Self {
        Self { backends, cache: ArcSwapOption::new(None), generation: AtomicU64::new(0) }
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub async fn load(&self) -> Result<ContentRead, ServiceError> {
        if let Some(hit) = self.cache.load_full() {
            return Ok(ContentRead {
                snapshot: hit.snapshot.clone(),
                served_by: hit.served_by,
                generation: hit.generation,
                from_cache: true,
            });
        }

        let mut last_err = None;
        for backend in &self.backends {
            match backend.load().await {
                Ok(snapshot) => {
                    let cached = Arc::new(CachedContent {
                        snapshot,
                        served_by: backend.name(),
                        generation: self.generation.load(Ordering::Acquire),
                    });
                    // Only fill an empty cache: a write that landed meanwhile is newer than this read.
                    let _ = self.cache.compare_and_swap(&None::<Arc<CachedContent>>, Some(Arc::clone(&cached)));
                    CONTENT_SERVED_TOTAL.with_label_values(&[backend.name()]).inc();
                    debug!(backend = backend.name(), "content loaded");
                    return Ok(ContentRead {
                        snapshot: cached.snapshot.clone(),
                        served_by: cached.served_by,
                        generation: cached.generation,
                        from_cache: false,
                    });
                }
                Err(e) => last_err = Some(self.note_failure(backend.as_ref(), "load", e)),
            }
        }
        Err(last_err.unwrap_or_else(|| ServiceError::Storage("no content backend configured".into())))
    }

    /// Full replace. Concurrent writers are last-writer-wins.
    pub async fn save(&self, content: ContentMap) -> Result<ContentRead, ServiceError> {
        let mut last_err = None;
        for backend in &self.backends {
            match backend.save(&content).await {
                Ok(snapshot) => {
                    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                    let cached = Arc::new(CachedContent { snapshot, served_by: backend.name(), generation });
                    self.cache.store(Some(Arc::clone(&cached)));
                    CONTENT_SERVED_TOTAL.with_label_values(&[backend.name()]).inc();
                    debug!(backend = backend.name(), generation, keys = content.len(), "content saved");
                    return Ok(ContentRead {
                        snapshot: cached.snapshot.clone(),
                        served_by: cached.served_by,
                        generation,
                        from_cache: false,
                    });
                }
                Err(e) => last_err = Some(self.note_failure(backend.as_ref(), "save", e)),
            }
        }
        Err(last_err.unwrap_or_else(|| ServiceError::Storage("no content backend configured".into())))
    }

    fn note_failure(&self, backend: &dyn ContentBackend, op: &'static str, e: ServiceError) -> ServiceError {
        warn!(backend = backend.name(), op, error = %e, "content backend failed; falling back");
        BACKEND_FAILURES_TOTAL.with_label_values(&[backend.name()]).inc();
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DbContentBackend, FileContentBackend};
    use crate::db::DbHandle;
    use crate::test_support::{temp_path, unreachable_config};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Backend that always fails and counts how often it was asked.
    #[derive(Default)]
    struct Broken {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentBackend for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn load(&self) -> Result<ContentSnapshot, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::BackendUnavailable("down".into()))
        }
        async fn save(&self, _: &ContentMap) -> Result<ContentSnapshot, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Storage("disk full".into()))
        }
    }

    fn sample() -> ContentMap {
        [("hero.title", "Welcome"), ("about", "We build things")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn falls_back_to_next_backend() -> Result<(), anyhow::Error> {
        let dir = temp_path("store");
        let broken = Arc::new(Broken::default());
        let store = ContentStore::new(vec![
            broken.clone() as Arc<dyn ContentBackend>,
            Arc::new(FileContentBackend::new(dir.join("content.json"))),
        ]);

        let saved = store.save(sample()).await?;
        assert_eq!(saved.served_by, "file");
        assert_eq!(saved.generation, 1);
        assert_eq!(saved.snapshot.content, sample());
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn reads_are_cached_until_next_write() -> Result<(), anyhow::Error> {
        let dir = temp_path("store");
        let broken = Arc::new(Broken::default());
        let store = ContentStore::new(vec![
            broken.clone() as Arc<dyn ContentBackend>,
            Arc::new(FileContentBackend::new(dir.join("content.json"))),
        ]);

        let first = store.load().await?;
        assert!(!first.from_cache);
        assert_eq!(first.served_by, "file");
        let second = store.load().await?;
        assert!(second.from_cache);
        // cached reads never reach the backends
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);

        store.save(sample()).await?;
        let third = store.load().await?;
        assert!(third.from_cache);
        assert_eq!(third.generation, 1);
        assert_eq!(third.snapshot.content, sample());

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn all_backends_failing_surfaces_last_error() {
        let store = ContentStore::new(vec![
            Arc::new(Broken::default()) as Arc<dyn ContentBackend>,
            Arc::new(Broken::default()),
        ]);
        assert!(matches!(store.load().await, Err(ServiceError::BackendUnavailable(_))));
        assert!(matches!(store.save(sample()).await, Err(ServiceError::Storage(_))));
    }

    #[tokio::test]
    async fn unreachable_database_falls_back_to_file() -> Result<(), anyhow::Error> {
        let dir = temp_path("store");
        let handle = Arc::new(DbHandle::new(unreachable_config()));
        let store = ContentStore::new(vec![
            Arc::new(DbContentBackend::new(handle)) as Arc<dyn ContentBackend>,
            Arc::new(FileContentBackend::new(dir.join("content.json"))),
        ]);

        let saved = store.save(sample()).await?;
        assert_eq!(saved.served_by, "file");

        // a fresh store over the same file sees the data without the database
        let handle = Arc::new(DbHandle::new(unreachable_config()));
        let fresh = ContentStore::new(vec![
            Arc::new(DbContentBackend::new(handle)) as Arc<dyn ContentBackend>,
            Arc::new(FileContentBackend::new(dir.join("content.json"))),
        ]);
        let loaded = fresh.load().await?;
        assert_eq!(loaded.snapshot.content, sample());
        assert_eq!(loaded.served_by, "file");

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }
}
