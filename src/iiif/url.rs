//! The full IIIF request URL: identifier plus the four operation segments.

use crate::error::ParseError;

use super::region::Region;
use super::size::Size;

// =============================================================================
// Rotation
// =============================================================================

/// Mirroring plus rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub mirror: bool,
    pub degrees: f64,
}

impl Rotation {
    /// Parse a rotation segment: an optional leading `!` (mirror) followed by
    /// a real number of degrees. Degrees must satisfy `0 <= d < 360`; `360`
    /// itself is rejected.
    pub fn parse(s: &str) -> Result<Rotation, ParseError> {
        let (mirror, deg_str) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let degrees: f64 = deg_str
            .parse()
            .map_err(|_| ParseError::InvalidRotation(s.to_string()))?;

        if !(0.0..360.0).contains(&degrees) {
            return Err(ParseError::InvalidRotation(s.to_string()));
        }

        Ok(Rotation { mirror, degrees })
    }

    /// True when this rotation leaves the image untouched.
    pub fn is_noop(&self) -> bool {
        !self.mirror && self.degrees == 0.0
    }

    pub fn to_segment(&self) -> String {
        if self.mirror {
            format!("!{}", self.degrees)
        } else {
            format!("{}", self.degrees)
        }
    }
}

// =============================================================================
// Quality
// =============================================================================

/// Requested color treatment. Unknown values survive parsing so the feature
/// gate can answer 501 rather than the parser answering 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quality {
    Default,
    Color,
    Gray,
    Bitonal,
    /// Legacy IIIF 1.x alias for `Default`.
    Native,
    Unknown(String),
}

impl Quality {
    pub fn parse(s: &str) -> Quality {
        match s {
            "default" => Quality::Default,
            "color" => Quality::Color,
            "gray" => Quality::Gray,
            "bitonal" => Quality::Bitonal,
            "native" => Quality::Native,
            other => Quality::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Quality::Default => "default",
            Quality::Color => "color",
            Quality::Gray => "gray",
            Quality::Bitonal => "bitonal",
            Quality::Native => "native",
            Quality::Unknown(s) => s,
        }
    }
}

// =============================================================================
// Format
// =============================================================================

/// Requested output format. As with [`Quality`], unknown extensions parse
/// into `Unknown` and fail at the feature gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    Jpg,
    Png,
    Gif,
    Tif,
    Jp2,
    Pdf,
    Webp,
    Unknown(String),
}

impl Format {
    pub fn parse(s: &str) -> Format {
        match s {
            "jpg" => Format::Jpg,
            "png" => Format::Png,
            "gif" => Format::Gif,
            "tif" => Format::Tif,
            "jp2" => Format::Jp2,
            "pdf" => Format::Pdf,
            "webp" => Format::Webp,
            other => Format::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::Tif => "tif",
            Format::Jp2 => "jp2",
            Format::Pdf => "pdf",
            Format::Webp => "webp",
            Format::Unknown(s) => s,
        }
    }

    /// The media type sent in Content-Type for this format.
    pub fn media_type(&self) -> &'static str {
        match self {
            Format::Jpg => "image/jpeg",
            Format::Png => "image/png",
            Format::Gif => "image/gif",
            Format::Tif => "image/tiff",
            Format::Jp2 => "image/jp2",
            Format::Pdf => "application/pdf",
            Format::Webp => "image/webp",
            Format::Unknown(_) => "application/octet-stream",
        }
    }
}

// =============================================================================
// IiifUrl
// =============================================================================

/// A fully parsed IIIF request.
///
/// Either an info request (`{id}/info.json`, in which case the operation
/// fields hold their defaults) or an image request with all five parts.
#[derive(Debug, Clone, PartialEq)]
pub struct IiifUrl {
    /// Percent-decoded identifier; may contain slashes and a scheme prefix.
    pub id: String,
    pub region: Region,
    pub size: Size,
    pub rotation: Rotation,
    pub quality: Quality,
    pub format: Format,
    /// True for `{id}/info.json` requests.
    pub info: bool,
}

impl IiifUrl {
    /// Parse the path remainder after the IIIF base prefix.
    ///
    /// The input is the still-percent-encoded path, e.g.
    /// `some%2Fid/0,0,1000,1000/500,/!90/default.jpg`. The identifier is the
    /// join of every segment before the four-part operation tail and is
    /// percent-decoded exactly once.
    pub fn from_path(path: &str) -> Result<IiifUrl, ParseError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(ParseError::MalformedPath(path.to_string()));
        }

        let segments: Vec<&str> = path.split('/').collect();

        // Info request: everything before the trailing "info.json" is the id.
        if segments.len() >= 2 && *segments.last().unwrap() == "info.json" {
            let id = decode_id(&segments[..segments.len() - 1])?;
            return Ok(IiifUrl {
                id,
                region: Region::Full,
                size: Size::Full,
                rotation: Rotation {
                    mirror: false,
                    degrees: 0.0,
                },
                quality: Quality::Default,
                format: Format::Jpg,
                info: true,
            });
        }

        if segments.len() < 5 {
            return Err(ParseError::MalformedPath(path.to_string()));
        }

        let tail_start = segments.len() - 4;
        let id = decode_id(&segments[..tail_start])?;
        let region = Region::parse(segments[tail_start])?;
        let size = Size::parse(segments[tail_start + 1])?;
        let rotation = Rotation::parse(segments[tail_start + 2])?;

        let last = segments[tail_start + 3];
        let (quality_str, format_str) = last
            .rsplit_once('.')
            .ok_or_else(|| ParseError::InvalidQualityFormat(last.to_string()))?;
        if quality_str.is_empty() || format_str.is_empty() {
            return Err(ParseError::InvalidQualityFormat(last.to_string()));
        }

        Ok(IiifUrl {
            id,
            region,
            size,
            rotation,
            quality: Quality::parse(quality_str),
            format: Format::parse(format_str),
            info: false,
        })
    }

    /// Whether every component is individually valid and the id is non-empty.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
            && self.region.is_valid()
            && (0.0..360.0).contains(&self.rotation.degrees)
    }

    /// Render the canonical IIIF path for this request (id re-encoded).
    pub fn to_path(&self) -> String {
        let id = urlencoding::encode(&self.id);
        if self.info {
            return format!("{}/info.json", id);
        }
        format!(
            "{}/{}/{}/{}/{}.{}",
            id,
            self.region.to_segment(),
            self.size.to_segment(),
            self.rotation.to_segment(),
            self.quality.as_str(),
            self.format.as_str()
        )
    }

    /// The tile-cache key: the canonical rendering covers the identifier and
    /// all five operation components, so two normalized-equal requests share
    /// a slot.
    pub fn cache_key(&self) -> String {
        self.to_path()
    }
}

/// Join and percent-decode identifier segments.
fn decode_id(segments: &[&str]) -> Result<String, ParseError> {
    let joined = segments.join("/");
    let id = urlencoding::decode(&joined)
        .map_err(|_| ParseError::MalformedPath(joined.clone()))?
        .into_owned();
    if id.is_empty() {
        return Err(ParseError::EmptyId);
    }
    Ok(id)
}
