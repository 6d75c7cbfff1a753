//! The feature set: which IIIF 2.x operations this server will honor.
//!
//! A `FeatureSet` is compared against every parsed request; anything the set
//! does not cover is answered with 501. Three canonical presets correspond to
//! the IIIF compliance levels, and a deployment can override the whole set
//! with a TOML capabilities file whose keys are the field names below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TileError;

use super::url::{Format, IiifUrl, Quality, Rotation};
use super::{Region, Size};

/// Every IIIF 2.0 feature that can be encoded in a URL, plus the HTTP
/// features advertised in the info document profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FeatureSet {
    // Region options; `full` and `square` are always supported
    pub region_by_px: bool,
    pub region_by_pct: bool,

    // Size options; `full` and `max` are always supported
    pub size_by_wh_listed: bool,
    pub size_by_w: bool,
    pub size_by_h: bool,
    pub size_by_pct: bool,
    pub size_by_forced_wh: bool,
    pub size_by_wh: bool,
    pub size_above_full: bool,

    // Rotation and mirroring
    pub rotation_by_90s: bool,
    pub rotation_arbitrary: bool,
    pub mirroring: bool,

    // Quality
    pub default: bool,
    pub color: bool,
    pub gray: bool,
    pub bitonal: bool,

    // Format
    pub jpg: bool,
    pub png: bool,
    pub tif: bool,
    pub gif: bool,
    pub jp2: bool,
    pub pdf: bool,
    pub webp: bool,

    // HTTP features
    pub base_uri_redirect: bool,
    pub cors: bool,
    pub jsonld_media_type: bool,
    pub profile_link_header: bool,
    pub canonical_link_header: bool,
}

impl FeatureSet {
    /// The required features for a level-0-compliant server.
    pub fn level0() -> FeatureSet {
        FeatureSet {
            size_by_wh_listed: true,
            default: true,
            jpg: true,
            ..FeatureSet::default()
        }
    }

    /// The required features for a level-1-compliant server.
    pub fn level1() -> FeatureSet {
        FeatureSet {
            region_by_px: true,
            size_by_wh_listed: true,
            size_by_w: true,
            size_by_h: true,
            size_by_pct: true,
            default: true,
            jpg: true,
            base_uri_redirect: true,
            cors: true,
            jsonld_media_type: true,
            ..FeatureSet::default()
        }
    }

    /// The required features for a level-2-compliant server.
    pub fn level2() -> FeatureSet {
        FeatureSet {
            region_by_px: true,
            region_by_pct: true,
            size_by_wh_listed: true,
            size_by_w: true,
            size_by_h: true,
            size_by_pct: true,
            size_by_forced_wh: true,
            size_by_wh: true,
            rotation_by_90s: true,
            default: true,
            color: true,
            gray: true,
            bitonal: true,
            jpg: true,
            png: true,
            base_uri_redirect: true,
            cors: true,
            jsonld_media_type: true,
            ..FeatureSet::default()
        }
    }

    /// Everything this server's pipeline can actually do. This is the default
    /// when no capabilities file is configured.
    pub fn native() -> FeatureSet {
        FeatureSet {
            region_by_px: true,
            region_by_pct: true,
            size_by_wh_listed: true,
            size_by_w: true,
            size_by_h: true,
            size_by_pct: true,
            size_by_forced_wh: true,
            size_by_wh: true,
            rotation_by_90s: true,
            rotation_arbitrary: true,
            mirroring: true,
            default: true,
            color: true,
            gray: true,
            bitonal: true,
            jpg: true,
            png: true,
            tif: true,
            gif: true,
            base_uri_redirect: true,
            cors: true,
            jsonld_media_type: true,
            ..FeatureSet::default()
        }
    }

    /// Load a custom feature set from a TOML capabilities file. Unlisted
    /// keys default to false, so a file describes the complete set.
    pub fn from_toml_file(path: &Path) -> Result<FeatureSet, TileError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TileError::Fetch(format!("capabilities file {:?}: {}", path, e)))?;
        toml::from_str(&text)
            .map_err(|e| TileError::Fetch(format!("capabilities file {:?}: {}", path, e)))
    }

    /// Whether this feature set will perform the operation the URL requests.
    /// Unsupported requests are expected to be answered with 501.
    pub fn supported(&self, u: &IiifUrl) -> bool {
        self.supports_region(&u.region)
            && self.supports_size(&u.size)
            && self.supports_rotation(&u.rotation)
            && self.supports_quality(&u.quality)
            && self.supports_format(&u.format)
    }

    pub fn supports_region(&self, r: &Region) -> bool {
        match r {
            Region::Pixel { .. } => self.region_by_px,
            Region::Percent { .. } => self.region_by_pct,
            Region::Full | Region::Square => true,
        }
    }

    pub fn supports_size(&self, s: &Size) -> bool {
        match s {
            Size::Width(_) => self.size_by_w,
            Size::Height(_) => self.size_by_h,
            Size::Percent(_) => self.size_by_pct,
            Size::Exact { .. } => self.size_by_forced_wh,
            Size::BestFit { .. } => self.size_by_wh,
            Size::Full | Size::Max => true,
        }
    }

    pub fn supports_rotation(&self, r: &Rotation) -> bool {
        if r.mirror && !self.mirroring {
            return false;
        }

        if r.degrees == 0.0 {
            true
        } else if r.degrees == 90.0 || r.degrees == 180.0 || r.degrees == 270.0 {
            self.rotation_by_90s || self.rotation_arbitrary
        } else {
            self.rotation_arbitrary
        }
    }

    pub fn supports_quality(&self, q: &Quality) -> bool {
        match q {
            Quality::Color => self.color,
            Quality::Gray => self.gray,
            Quality::Bitonal => self.bitonal,
            Quality::Default | Quality::Native => self.default,
            Quality::Unknown(_) => false,
        }
    }

    pub fn supports_format(&self, f: &Format) -> bool {
        match f {
            Format::Jpg => self.jpg,
            Format::Tif => self.tif,
            Format::Png => self.png,
            Format::Gif => self.gif,
            Format::Jp2 => self.jp2,
            Format::Pdf => self.pdf,
            Format::Webp => self.webp,
            Format::Unknown(_) => false,
        }
    }

    /// The highest canonical compliance level wholly contained in this set.
    pub fn compliance_level(&self) -> u8 {
        if self.contains(&FeatureSet::level2()) {
            2
        } else if self.contains(&FeatureSet::level1()) {
            1
        } else {
            0
        }
    }

    /// True when every feature, quality, and format enabled in `other` is
    /// also enabled here.
    fn contains(&self, other: &FeatureSet) -> bool {
        let names = self.enabled_names();
        let qualities = self.enabled_qualities();
        let formats = self.enabled_formats();
        other.enabled_names().iter().all(|n| names.contains(n))
            && other
                .enabled_qualities()
                .iter()
                .all(|q| qualities.contains(q))
            && other.enabled_formats().iter().all(|f| formats.contains(f))
    }

    /// IIIF profile names of every enabled non-quality, non-format feature.
    pub fn enabled_names(&self) -> Vec<&'static str> {
        let flags = [
            (self.region_by_px, "regionByPx"),
            (self.region_by_pct, "regionByPct"),
            (self.size_by_wh_listed, "sizeByWhListed"),
            (self.size_by_w, "sizeByW"),
            (self.size_by_h, "sizeByH"),
            (self.size_by_pct, "sizeByPct"),
            (self.size_by_forced_wh, "sizeByForcedWh"),
            (self.size_by_wh, "sizeByWh"),
            (self.size_above_full, "sizeAboveFull"),
            (self.rotation_by_90s, "rotationBy90s"),
            (self.rotation_arbitrary, "rotationArbitrary"),
            (self.mirroring, "mirroring"),
            (self.base_uri_redirect, "baseUriRedirect"),
            (self.cors, "cors"),
            (self.jsonld_media_type, "jsonldMediaType"),
            (self.profile_link_header, "profileLinkHeader"),
            (self.canonical_link_header, "canonicalLinkHeader"),
        ];
        flags
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect()
    }

    /// Names of every enabled quality.
    pub fn enabled_qualities(&self) -> Vec<&'static str> {
        let flags = [
            (self.default, "default"),
            (self.color, "color"),
            (self.gray, "gray"),
            (self.bitonal, "bitonal"),
        ];
        flags
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect()
    }

    /// Names of every enabled format.
    pub fn enabled_formats(&self) -> Vec<&'static str> {
        let flags = [
            (self.jpg, "jpg"),
            (self.png, "png"),
            (self.tif, "tif"),
            (self.gif, "gif"),
            (self.jp2, "jp2"),
            (self.pdf, "pdf"),
            (self.webp, "webp"),
        ];
        flags
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect()
    }
}
