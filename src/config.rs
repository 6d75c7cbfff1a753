//! Configuration.
//!
//! Every option is available as a CLI flag and as a `TESSERA_`-prefixed
//! environment variable. A TOML capabilities file can replace the advertised
//! feature set wholesale; everything else has a sensible default except the
//! tile path and the public IIIF URL, which are required.

use std::path::PathBuf;

use clap::Parser;

/// Default bind address.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:12415";

/// Default info-cache capacity (entries).
pub const DEFAULT_INFO_CACHE_LEN: usize = 10_000;

/// Default on-disk cache for the s3 resolver.
pub const DEFAULT_S3_CACHE: &str = "/var/cache/tessera-s3";

/// tessera - an IIIF Image API 2.x tile server.
///
/// Serves derived images and IIIF info documents from local JP2, TIFF, PNG,
/// and JPEG sources, with optional pull-through caching of S3-hosted assets.
#[derive(Parser, Debug, Clone)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Filesystem root for identifiers with no scheme prefix.
    #[arg(long, env = "TESSERA_TILE_PATH")]
    pub tile_path: PathBuf,

    /// Public base URL for the IIIF surface, e.g. "http://example.com/iiif".
    #[arg(long, env = "TESSERA_IIIF_URL")]
    pub iiif_url: String,

    /// Address to bind the HTTP listener to.
    #[arg(long, default_value = DEFAULT_ADDRESS, env = "TESSERA_ADDRESS")]
    pub address: String,

    /// Maximum cached image-info entries; 0 disables the info cache.
    #[arg(long, default_value_t = DEFAULT_INFO_CACHE_LEN, env = "TESSERA_INFO_CACHE_LEN")]
    pub info_cache_len: usize,

    /// Maximum cached encoded tiles; 0 disables the tile cache.
    #[arg(long, default_value_t = 0, env = "TESSERA_TILE_CACHE_LEN")]
    pub tile_cache_len: usize,

    /// Maximum output area (width x height) served per request.
    #[arg(long, default_value_t = u64::MAX, env = "TESSERA_IMAGE_MAX_AREA")]
    pub image_max_area: u64,

    /// Maximum output width served per request.
    #[arg(long, default_value_t = u32::MAX, env = "TESSERA_IMAGE_MAX_WIDTH")]
    pub image_max_width: u32,

    /// Maximum output height served per request.
    #[arg(long, default_value_t = u32::MAX, env = "TESSERA_IMAGE_MAX_HEIGHT")]
    pub image_max_height: u32,

    /// TOML file describing the advertised feature set, replacing the
    /// built-in defaults.
    #[arg(long, env = "TESSERA_CAPABILITIES_FILE")]
    pub capabilities_file: Option<PathBuf>,

    /// Log level: DEBUG, INFO, WARN, ERROR, or CRIT.
    #[arg(long, default_value = "DEBUG", env = "TESSERA_LOG_LEVEL")]
    pub log_level: String,

    /// Comma-separated resolver identifiers, in chain order.
    #[arg(long, default_value = "s3-images", env = "TESSERA_PLUGINS", value_delimiter = ',')]
    pub plugins: Vec<String>,

    /// Local cache directory for the s3 resolver.
    #[arg(long, default_value = DEFAULT_S3_CACHE, env = "TESSERA_S3_CACHE")]
    pub s3_cache: PathBuf,

    /// AWS region for the s3 resolver.
    #[arg(long, env = "TESSERA_S3_ZONE")]
    pub s3_zone: Option<String>,

    /// Bucket the s3 resolver pulls from.
    #[arg(long, env = "TESSERA_S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Custom S3 endpoint for S3-compatible stores (MinIO, etc.).
    #[arg(long, env = "TESSERA_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,
}

impl Config {
    /// Validate the configuration, returning a human-readable message on the
    /// first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let (scheme, rest) = self
            .iiif_url
            .split_once("://")
            .ok_or_else(|| format!("IIIF URL {:?} has no scheme", self.iiif_url))?;
        if scheme.is_empty() {
            return Err(format!("IIIF URL {:?} has an empty scheme", self.iiif_url));
        }

        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        if host.is_empty() {
            return Err(format!("IIIF URL {:?} has an empty host", self.iiif_url));
        }
        if path.trim_matches('/').is_empty() {
            return Err(format!(
                "IIIF URL {:?} needs a path (e.g. /iiif)",
                self.iiif_url
            ));
        }

        if log_level_filter(&self.log_level).is_none() {
            return Err(format!(
                "log level {:?} must be DEBUG, INFO, WARN, ERROR, or CRIT",
                self.log_level
            ));
        }

        if self.tile_path.as_os_str().is_empty() {
            return Err("tile path must not be empty".to_string());
        }

        Ok(())
    }

    /// Whether the s3 resolver should be wired up.
    pub fn s3_enabled(&self) -> bool {
        self.plugins.iter().any(|p| p == "s3-images")
            && self.s3_bucket.as_deref().is_some_and(|b| !b.is_empty())
    }

    /// The tracing filter directive for the configured log level.
    pub fn log_filter(&self) -> String {
        // validate() has already vetted the level
        let level = log_level_filter(&self.log_level).unwrap_or("debug");
        format!("tessera={level},tower_http={level}")
    }
}

/// Map the config level names onto tracing levels. CRIT collapses into
/// `error`, the highest level tracing has.
fn log_level_filter(level: &str) -> Option<&'static str> {
    match level.to_ascii_uppercase().as_str() {
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        "ERROR" | "CRIT" => Some("error"),
        _ => None,
    }
}
