//! IIIF size parameter: the output dimensions of the extracted region.

use crate::error::ParseError;

/// A parsed IIIF size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Size {
    /// The extracted region at its native size.
    Full,
    /// Alias of `Full` in IIIF 2.x (capped by server maximums).
    Max,
    /// `w,`: scale to the given width, preserving aspect ratio.
    Width(u32),
    /// `,h`: scale to the given height, preserving aspect ratio.
    Height(u32),
    /// `pct:p`: scale both dimensions by p percent of the region size.
    Percent(f64),
    /// `w,h`: force both dimensions, possibly distorting.
    Exact { w: u32, h: u32 },
    /// `!w,h`: largest size that fits inside the box, preserving aspect.
    BestFit { w: u32, h: u32 },
}

impl Size {
    /// Parse a size path segment.
    ///
    /// Accepted forms: `full`, `max`, `w,`, `,h`, `pct:p`, `w,h`, `!w,h`.
    pub fn parse(s: &str) -> Result<Size, ParseError> {
        match s {
            "full" => return Ok(Size::Full),
            "max" => return Ok(Size::Max),
            _ => {}
        }

        if let Some(pct) = s.strip_prefix("pct:") {
            let p: f64 = pct
                .parse()
                .map_err(|_| ParseError::InvalidSize(s.to_string()))?;
            // Percent above 100 parses; the size-above-full gate decides later.
            if p <= 0.0 || !p.is_finite() {
                return Err(ParseError::InvalidSize(s.to_string()));
            }
            return Ok(Size::Percent(p));
        }

        let (best_fit, dims) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (w_str, h_str) = dims
            .split_once(',')
            .ok_or_else(|| ParseError::InvalidSize(s.to_string()))?;

        let parse_dim = |d: &str| -> Result<Option<u32>, ParseError> {
            if d.is_empty() {
                return Ok(None);
            }
            let v: u32 = d
                .parse()
                .map_err(|_| ParseError::InvalidSize(s.to_string()))?;
            if v == 0 {
                return Err(ParseError::InvalidSize(s.to_string()));
            }
            Ok(Some(v))
        };

        match (parse_dim(w_str)?, parse_dim(h_str)?) {
            (Some(w), Some(h)) if best_fit => Ok(Size::BestFit { w, h }),
            (Some(w), Some(h)) => Ok(Size::Exact { w, h }),
            (Some(w), None) if !best_fit => Ok(Size::Width(w)),
            (None, Some(h)) if !best_fit => Ok(Size::Height(h)),
            _ => Err(ParseError::InvalidSize(s.to_string())),
        }
    }

    /// Render the canonical path segment for this size.
    pub fn to_segment(&self) -> String {
        match *self {
            Size::Full => "full".to_string(),
            Size::Max => "max".to_string(),
            Size::Width(w) => format!("{},", w),
            Size::Height(h) => format!(",{}", h),
            Size::Percent(p) => format!("pct:{}", p),
            Size::Exact { w, h } => format!("{},{}", w, h),
            Size::BestFit { w, h } => format!("!{},{}", w, h),
        }
    }
}
