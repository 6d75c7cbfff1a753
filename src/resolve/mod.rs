//! Identifier resolution: mapping an IIIF id to a local file path.
//!
//! Resolvers form an ordered chain. Each resolver either resolves the id,
//! skips it (not mine), or fails; the first non-skip terminates the chain. An
//! id no resolver claims falls through to the filesystem root configured with
//! `--tile-path`. Resolvers are registered statically at startup from the
//! `--plugins` list.

pub mod s3;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TileError;

pub use s3::{create_s3_client, AssetFetcher, AssetStore, S3Fetcher, S3Resolver};

/// Outcome of one resolver looking at an id.
#[derive(Debug)]
pub enum Resolution {
    /// This resolver owns the id and produced a local path.
    Resolved(PathBuf),
    /// Not this resolver's id; try the next one.
    Skipped,
    /// This resolver owns the id but could not produce a path.
    Failed(TileError),
}

/// One link in the resolver chain.
#[async_trait]
pub trait IdResolver: Send + Sync {
    /// Identifier used in logs and the `--plugins` list.
    fn name(&self) -> &'static str;

    async fn resolve(&self, id: &str) -> Resolution;

    /// Called once during graceful shutdown, after the server has drained.
    async fn teardown(&self) {}
}

/// The ordered chain plus the terminal filesystem fallback.
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn IdResolver>>,
    tile_path: PathBuf,
}

impl ResolverChain {
    pub fn new(tile_path: PathBuf) -> Self {
        Self {
            resolvers: Vec::new(),
            tile_path,
        }
    }

    pub fn push(&mut self, resolver: Arc<dyn IdResolver>) {
        self.resolvers.push(resolver);
    }

    /// Resolve an id to an existing local file, or 404.
    pub async fn resolve(&self, id: &str) -> Result<PathBuf, TileError> {
        for resolver in &self.resolvers {
            match resolver.resolve(id).await {
                Resolution::Resolved(path) => {
                    debug!(id, resolver = resolver.name(), path = %path.display(), "id resolved");
                    return self.require_exists(id, path).await;
                }
                Resolution::Skipped => continue,
                Resolution::Failed(err) => return Err(err),
            }
        }

        // Terminal fallback: ids without a scheme map under the tile root
        let path = safe_join(&self.tile_path, id)
            .ok_or_else(|| TileError::NotFound(id.to_string()))?;
        self.require_exists(id, path).await
    }

    async fn require_exists(&self, id: &str, path: PathBuf) -> Result<PathBuf, TileError> {
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(path),
            _ => Err(TileError::NotFound(id.to_string())),
        }
    }

    pub async fn teardown(&self) {
        for resolver in &self.resolvers {
            resolver.teardown().await;
        }
    }
}

/// Join an untrusted id under a root, refusing parent-directory escapes.
fn safe_join(root: &Path, id: &str) -> Option<PathBuf> {
    let rel = Path::new(id);
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return None,
        }
    }
    Some(root.join(rel))
}
