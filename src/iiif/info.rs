//! The IIIF `info.json` document.

use serde::Serialize;
use serde_json::{json, Value};

use crate::codec::ImageInfo;

use super::FeatureSet;

const CONTEXT: &str = "http://iiif.io/api/image/2/context.json";
const PROTOCOL: &str = "http://iiif.io/api/image";

/// Tile-size hint advertised to viewers.
#[derive(Debug, Clone, Serialize)]
pub struct TileHint {
    pub width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
}

/// The info document for one source image.
///
/// The profile is the usual heterogeneous array: the compliance-level URI
/// followed by an object listing the full formats/qualities/supports sets.
#[derive(Debug, Clone, Serialize)]
pub struct InfoDocument {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@id")]
    pub id: String,
    pub protocol: &'static str,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<TileHint>>,
    pub profile: Vec<Value>,
}

impl InfoDocument {
    /// Build the document for an image.
    ///
    /// `public_base` is the configured IIIF base URL; the document id is
    /// `{public_base}/{encoded id}`.
    pub fn new(public_base: &str, id: &str, info: &ImageInfo, features: &FeatureSet) -> Self {
        let tiles = info.tile_width.map(|tw| {
            vec![TileHint {
                width: tw,
                height: info.tile_height.filter(|th| *th != tw),
                scale_factors: info.scale_factors(),
            }]
        });

        let level_uri = format!(
            "http://iiif.io/api/image/2/level{}.json",
            features.compliance_level()
        );
        let profile = vec![
            Value::String(level_uri),
            json!({
                "formats": features.enabled_formats(),
                "qualities": features.enabled_qualities(),
                "supports": features.enabled_names(),
            }),
        ];

        InfoDocument {
            context: CONTEXT,
            id: format!(
                "{}/{}",
                public_base.trim_end_matches('/'),
                urlencoding::encode(id)
            ),
            protocol: PROTOCOL,
            width: info.width,
            height: info.height,
            tiles,
            profile,
        }
    }
}
