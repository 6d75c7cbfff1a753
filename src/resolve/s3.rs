//! The `s3:` resolver: remote assets cached on the local filesystem.
//!
//! Ids of the form `s3:<key>` map into a sharded cache directory. A missing
//! cache file triggers a download coordinated through a single-flight table,
//! so any number of concurrent requests for the same key produce exactly one
//! fetch. Cache eviction is managed externally (a cron sweep over atimes is
//! enough); this module only ever writes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use crate::error::TileError;

use super::{IdResolver, Resolution};

/// Id prefix this resolver claims.
const SCHEME: &str = "s3:";

/// How long a request will wait on another request's in-flight download.
const IN_FLIGHT_WAIT: Duration = Duration::from_secs(10);

// =============================================================================
// Shard buckets
// =============================================================================

/// FNV-1 32-bit hash, the stable basis for cache sharding.
fn fnv1_32(data: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for byte in data {
        hash = hash.wrapping_mul(0x01000193);
        hash ^= *byte as u32;
    }
    hash
}

/// Two 100-bucket directory shards for a key. The fan-out keeps any one
/// directory from accumulating an unlistable number of cached files.
pub(crate) fn shard_buckets(key: &str) -> (u32, u32) {
    let val = fnv1_32(key.as_bytes()) / 10_000;
    (val % 100, (val / 100) % 100)
}

// =============================================================================
// Fetcher
// =============================================================================

/// Downloads one remote object to a local file. Abstracted so the
/// single-flight machinery can be exercised without a network.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, key: &str, dest: &Path) -> Result<(), TileError>;
}

/// Fetcher backed by an S3 (or S3-compatible) bucket.
pub struct S3Fetcher {
    client: Client,
    bucket: String,
}

impl S3Fetcher {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl AssetFetcher for S3Fetcher {
    async fn fetch(&self, key: &str, dest: &Path) -> Result<(), TileError> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if not_found {
                    TileError::NotFound(format!("{}{}", SCHEME, key))
                } else {
                    TileError::Fetch(format!("s3://{}/{}: {}", self.bucket, key, e))
                }
            })?;

        let mut body = resp.body.into_async_read();
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| TileError::Fetch(format!("create {:?}: {}", dest, e)))?;
        tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| TileError::Fetch(format!("write {:?}: {}", dest, e)))?;
        Ok(())
    }
}

/// Build an S3 client, optionally against a custom endpoint (MinIO and
/// friends) or a specific region.
pub async fn create_s3_client(endpoint: Option<&str>, region: Option<String>) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(aws_sdk_s3::config::Region::new(region));
    }
    let shared = loader.load().await;

    match endpoint {
        Some(endpoint) => {
            let config = aws_sdk_s3::config::Builder::from(&shared)
                .endpoint_url(endpoint)
                .force_path_style(true)
                .build();
            Client::from_conf(config)
        }
        None => Client::new(&shared),
    }
}

// =============================================================================
// Asset store
// =============================================================================

/// State one leader publishes for its waiters.
struct InFlight {
    notify: Notify,
    result: Mutex<Option<Result<PathBuf, TileError>>>,
}

/// The local cache of remote assets with single-flight download
/// coordination.
///
/// For any key, at most one download runs across the process. Waiters block
/// on the leader's completion (bounded by [`IN_FLIGHT_WAIT`]) and then
/// re-check the cache. Downloads land in a `.part` temp file and are renamed
/// into place, so a partially written asset is never readable under its
/// final name.
pub struct AssetStore {
    cache_root: PathBuf,
    in_flight: Mutex<HashMap<String, Arc<InFlight>>>,
}

impl AssetStore {
    pub fn new(cache_root: PathBuf) -> Self {
        Self {
            cache_root,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The sharded cache path for a key.
    pub fn cache_path(&self, key: &str) -> PathBuf {
        let (b1, b2) = shard_buckets(key);
        let safe_key = key.replace('/', "_");
        self.cache_root
            .join(b1.to_string())
            .join(b2.to_string())
            .join(safe_key)
    }

    /// Return the local path for a key, downloading it first if needed.
    pub async fn fetch(
        &self,
        key: &str,
        fetcher: &dyn AssetFetcher,
    ) -> Result<PathBuf, TileError> {
        let path = self.cache_path(key);

        loop {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(path);
            }

            let role = {
                let mut in_flight = self.in_flight.lock().await;
                match in_flight.get(key) {
                    Some(state) => Role::Waiter(state.clone()),
                    None => {
                        let state = Arc::new(InFlight {
                            notify: Notify::new(),
                            result: Mutex::new(None),
                        });
                        in_flight.insert(key.to_string(), state.clone());
                        Role::Leader(state)
                    }
                }
            };

            match role {
                Role::Leader(state) => {
                    debug!(key, path = %path.display(), "no cached asset, downloading");
                    let result = self.download(key, &path, fetcher).await;

                    *state.result.lock().await = Some(result.clone());
                    self.in_flight.lock().await.remove(key);
                    state.notify.notify_waiters();

                    return result;
                }
                Role::Waiter(state) => {
                    let waited =
                        tokio::time::timeout(IN_FLIGHT_WAIT, state.notify.notified()).await;
                    if waited.is_err() {
                        return Err(TileError::Fetch(format!(
                            "timed out waiting for in-flight download of {:?}",
                            key
                        )));
                    }
                    if let Some(result) = state.result.lock().await.clone() {
                        return result;
                    }
                    // Leader vanished without publishing; re-check the cache
                }
            }
        }
    }

    async fn download(
        &self,
        key: &str,
        path: &Path,
        fetcher: &dyn AssetFetcher,
    ) -> Result<PathBuf, TileError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TileError::Fetch(format!("create {:?}: {}", parent, e)))?;
        }

        // Single-flight guarantees no other writer touches this temp name
        let part = part_path(path);
        match fetcher.fetch(key, &part).await {
            Ok(()) => {
                tokio::fs::rename(&part, path)
                    .await
                    .map_err(|e| TileError::Fetch(format!("rename {:?}: {}", part, e)))?;
                Ok(path.to_path_buf())
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&part).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(part = %part.display(), error = %cleanup, "failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }
}

enum Role {
    Leader(Arc<InFlight>),
    Waiter(Arc<InFlight>),
}

/// The temp name a download writes into before the atomic rename. Appended
/// rather than substituted so keys differing only in extension stay distinct.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolver for `s3:<key>` ids.
pub struct S3Resolver {
    store: AssetStore,
    fetcher: Arc<dyn AssetFetcher>,
}

impl S3Resolver {
    pub fn new(cache_root: PathBuf, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            store: AssetStore::new(cache_root),
            fetcher,
        }
    }
}

#[async_trait]
impl IdResolver for S3Resolver {
    fn name(&self) -> &'static str {
        "s3-images"
    }

    async fn resolve(&self, id: &str) -> Resolution {
        let Some(key) = id.strip_prefix(SCHEME) else {
            return Resolution::Skipped;
        };
        if key.is_empty() || key.split('/').any(|part| part == "..") {
            return Resolution::Failed(TileError::NotFound(id.to_string()));
        }

        match self.store.fetch(key, self.fetcher.as_ref()).await {
            Ok(path) => Resolution::Resolved(path),
            Err(e) => Resolution::Failed(e),
        }
    }
}
