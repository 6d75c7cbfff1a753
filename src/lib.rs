//! tessera - an IIIF Image API 2.x tile server.
//!
//! Given an image identifier and a IIIF request describing a region, size,
//! rotation, quality, and output format, tessera returns the derived image.
//! JPEG-2000 sources are decoded at the cheapest wavelet resolution level
//! that still covers the requested output; PNG/TIFF/JPEG/GIF sources take a
//! generic decode path. Decoded metadata and rendered tiles sit in bounded
//! LRU caches, and `s3:`-prefixed identifiers are pulled into a local cache
//! with single-flight download coordination.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod iiif;
pub mod resolve;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use cache::{CachedTile, InfoCache, TileCache};
pub use codec::ImageInfo;
pub use config::Config;
pub use error::{ParseError, TileError};
pub use iiif::{FeatureSet, Format, IiifUrl, InfoDocument, Quality, Region, Rotation, Size};
pub use resolve::{AssetFetcher, AssetStore, IdResolver, Resolution, ResolverChain, S3Resolver};
pub use server::{create_router, AppState, RouterConfig};
pub use service::{ImageService, Maximums, Tile};
