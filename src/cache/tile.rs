//! LRU cache of encoded tiles.

use std::num::NonZeroUsize;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

/// One encoded response: the bytes plus the media type they were encoded as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTile {
    pub data: Bytes,
    pub content_type: &'static str,
}

/// Bounded LRU keyed by the full normalized request signature (identifier
/// plus all five URL components plus the encode format). Capacity zero
/// disables the cache.
pub struct TileCache {
    inner: Option<RwLock<LruCache<String, CachedTile>>>,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        let inner = NonZeroUsize::new(capacity).map(|cap| RwLock::new(LruCache::new(cap)));
        Self { inner }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Look up a request signature, marking the entry as recently used.
    pub async fn get(&self, key: &str) -> Option<CachedTile> {
        let cache = self.inner.as_ref()?;
        cache.write().await.get(key).cloned()
    }

    pub async fn put(&self, key: String, tile: CachedTile) {
        if let Some(cache) = self.inner.as_ref() {
            cache.write().await.put(key, tile);
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
