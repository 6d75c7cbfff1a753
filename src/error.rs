use thiserror::Error;

/// Errors produced while parsing an IIIF URL path.
///
/// Each variant carries the offending input segment so the handler can log a
/// useful line without echoing internals back to the client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The path did not have the `<id>/<region>/<size>/<rotation>/<quality>.<format>`
    /// shape (or `<id>/info.json`).
    #[error("malformed IIIF path: {0:?}")]
    MalformedPath(String),

    /// The identifier segment was empty after decoding.
    #[error("empty image identifier")]
    EmptyId,

    #[error("invalid region: {0:?}")]
    InvalidRegion(String),

    #[error("invalid size: {0:?}")]
    InvalidSize(String),

    #[error("invalid rotation: {0:?}")]
    InvalidRotation(String),

    /// Quality and format must both be present, dot-separated.
    #[error("invalid quality/format: {0:?}")]
    InvalidQualityFormat(String),
}

/// Errors from the tile pipeline. Every variant maps to exactly one HTTP
/// status; the mapping itself lives in the server layer.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Malformed request URL (400).
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The request parsed but the configured feature set refuses it (501).
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The identifier resolved to nothing (404).
    #[error("no image found for id {0:?}")]
    NotFound(String),

    /// Request is semantically impossible or exceeds configured limits (400).
    #[error("{0}")]
    Bounds(String),

    /// The decoder failed (500). `stage` names the step that broke.
    #[error("decode failed ({stage}): {message}")]
    Decode {
        stage: &'static str,
        message: String,
    },

    /// The requested output format cannot be produced. `supported` is false
    /// for formats this server can never encode (501); true when a normally
    /// working encoder failed (500).
    #[error("cannot encode {format:?} output: {message}")]
    Encode {
        format: String,
        message: String,
        supported: bool,
    },

    /// Remote asset unreachable or the in-flight wait timed out (502).
    #[error("remote fetch failed: {0}")]
    Fetch(String),
}

impl TileError {
    /// Shorthand for decode failures.
    pub fn decode(stage: &'static str, message: impl Into<String>) -> Self {
        TileError::Decode {
            stage,
            message: message.into(),
        }
    }
}
