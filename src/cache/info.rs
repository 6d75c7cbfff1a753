//! LRU cache of header facts per source path.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tokio::sync::RwLock;

use crate::codec::ImageInfo;

/// Bounded LRU mapping local path to [`ImageInfo`]. Entries are immutable
/// once written; eviction is oldest-access-first. Capacity zero disables the
/// cache entirely.
pub struct InfoCache {
    inner: Option<RwLock<LruCache<PathBuf, ImageInfo>>>,
}

impl InfoCache {
    pub fn new(capacity: usize) -> Self {
        let inner = NonZeroUsize::new(capacity).map(|cap| RwLock::new(LruCache::new(cap)));
        Self { inner }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Look up a path, marking the entry as recently used.
    pub async fn get(&self, path: &Path) -> Option<ImageInfo> {
        let cache = self.inner.as_ref()?;
        cache.write().await.get(path).copied()
    }

    pub async fn put(&self, path: PathBuf, info: ImageInfo) {
        if let Some(cache) = self.inner.as_ref() {
            cache.write().await.put(path, info);
        }
    }

    pub async fn len(&self) -> usize {
        match self.inner.as_ref() {
            Some(cache) => cache.read().await.len(),
            None => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
