//! The image service: one struct that owns every pipeline stage.
//!
//! A request flows feature gate -> tile-cache probe -> id resolution -> info
//! (cached) -> region/size normalization -> bounds checks -> decode ->
//! rotate/mirror -> quality -> encode -> tile-cache fill. Errors propagate
//! straight out; the only internal retry is the decoder's resolution-level
//! fallback.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::cache::{CachedTile, InfoCache, TileCache};
use crate::codec::{self, ImageInfo};
use crate::error::TileError;
use crate::iiif::{FeatureSet, IiifUrl};
use crate::resolve::ResolverChain;

/// Output limits checked against the *requested* output dimensions.
#[derive(Debug, Clone, Copy)]
pub struct Maximums {
    pub area: u64,
    pub width: u32,
    pub height: u32,
}

impl Default for Maximums {
    fn default() -> Self {
        Self {
            area: u64::MAX,
            width: u32::MAX,
            height: u32::MAX,
        }
    }
}

impl Maximums {
    fn check(&self, w: u32, h: u32) -> Result<(), TileError> {
        if w > self.width || h > self.height || (w as u64) * (h as u64) > self.area {
            return Err(TileError::Bounds(format!(
                "requested {}x{} output exceeds configured limits",
                w, h
            )));
        }
        Ok(())
    }
}

/// One rendered response.
#[derive(Debug, Clone)]
pub struct Tile {
    pub data: Bytes,
    pub content_type: &'static str,
    pub cache_hit: bool,
}

/// The server context: resolver chain, caches, feature set, and limits,
/// grouped so handlers receive everything explicitly.
pub struct ImageService {
    resolvers: ResolverChain,
    features: FeatureSet,
    info_cache: InfoCache,
    tile_cache: TileCache,
    maximums: Maximums,
}

impl ImageService {
    pub fn new(
        resolvers: ResolverChain,
        features: FeatureSet,
        info_cache_len: usize,
        tile_cache_len: usize,
        maximums: Maximums,
    ) -> Self {
        Self {
            resolvers,
            features,
            info_cache: InfoCache::new(info_cache_len),
            tile_cache: TileCache::new(tile_cache_len),
            maximums,
        }
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Header facts for an id, via the info cache.
    pub async fn info(&self, id: &str) -> Result<ImageInfo, TileError> {
        let path = self.resolvers.resolve(id).await?;
        self.info_for_path(&path).await
    }

    async fn info_for_path(&self, path: &Path) -> Result<ImageInfo, TileError> {
        if let Some(info) = self.info_cache.get(path).await {
            return Ok(info);
        }

        let owned = path.to_path_buf();
        let info = tokio::task::spawn_blocking(move || codec::read_info(&owned))
            .await
            .map_err(|e| TileError::decode("read header", e.to_string()))??;

        self.info_cache.put(path.to_path_buf(), info).await;
        Ok(info)
    }

    /// Render an image request end to end.
    pub async fn image(&self, url: &IiifUrl) -> Result<Tile, TileError> {
        if !self.features.supported(url) {
            return Err(TileError::Unsupported(format!(
                "request {:?} is outside this server's feature set",
                url.to_path()
            )));
        }

        let key = url.cache_key();
        if let Some(hit) = self.tile_cache.get(&key).await {
            debug!(key, "tile cache hit");
            return Ok(Tile {
                data: hit.data,
                content_type: hit.content_type,
                cache_hit: true,
            });
        }

        let path = self.resolvers.resolve(&url.id).await?;
        let info = self.info_for_path(&path).await?;

        let region = codec::region_rect(&url.region, info.width, info.height)?;
        let (out_w, out_h) = codec::output_size(&url.size, region.w, region.h);

        if (out_w > region.w || out_h > region.h) && !self.features.size_above_full {
            return Err(TileError::Unsupported(
                "sizes above the extracted region require sizeAboveFull".to_string(),
            ));
        }
        self.maximums.check(out_w, out_h)?;

        let img = self.decode(path, region, out_w, out_h).await?;
        let img = codec::apply_rotation(img, &url.rotation);
        let img = codec::apply_quality(img, &url.quality);

        let (data, content_type) = codec::encode(&img, &url.format)?;

        self.tile_cache
            .put(
                key,
                CachedTile {
                    data: data.clone(),
                    content_type,
                },
            )
            .await;

        Ok(Tile {
            data,
            content_type,
            cache_hit: false,
        })
    }

    /// Run the decode on the blocking pool; native decoders are not assumed
    /// to tolerate the async scheduler.
    async fn decode(
        &self,
        path: PathBuf,
        region: codec::Rect,
        out_w: u32,
        out_h: u32,
    ) -> Result<image::DynamicImage, TileError> {
        tokio::task::spawn_blocking(move || codec::decode_region(&path, region, out_w, out_h))
            .await
            .map_err(|e| TileError::decode("decompress", e.to_string()))?
    }

    /// Shut down the resolver chain.
    pub async fn teardown(&self) {
        self.resolvers.teardown().await;
    }

    #[cfg(test)]
    pub(crate) async fn tile_cache_len(&self) -> usize {
        self.tile_cache.len().await
    }
}
