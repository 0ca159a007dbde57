// Well-known-text point handling
//
// SQLite has no native geometry type, so location geometry is stored and
// served as WKT `POINT(lon lat)` strings. This module is the single place
// that parses and formats them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid WKT point: {0}")]
pub struct InvalidWkt(pub String);

/// A geographic point in lon/lat order, matching WKT axis order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Parse a WKT `POINT(lon lat)` string. The tag is case-insensitive and
    /// interior whitespace is flexible, e.g. `point ( 79.8612 6.9271 )`.
    pub fn from_wkt(wkt: &str) -> Result<Self, InvalidWkt> {
        let s = wkt.trim();
        let rest = s
            .get(..5)
            .filter(|tag| tag.eq_ignore_ascii_case("POINT"))
            .map(|_| s[5..].trim())
            .ok_or_else(|| InvalidWkt(wkt.to_string()))?;

        let inner = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(|| InvalidWkt(wkt.to_string()))?;

        let mut coords = inner.split_whitespace();
        let lon = coords
            .next()
            .and_then(|c| c.parse::<f64>().ok())
            .ok_or_else(|| InvalidWkt(wkt.to_string()))?;
        let lat = coords
            .next()
            .and_then(|c| c.parse::<f64>().ok())
            .ok_or_else(|| InvalidWkt(wkt.to_string()))?;
        if coords.next().is_some() || !lon.is_finite() || !lat.is_finite() {
            return Err(InvalidWkt(wkt.to_string()));
        }

        Ok(Self { lon, lat })
    }

    pub fn to_wkt(self) -> String {
        format!("POINT({} {})", self.lon, self.lat)
    }
}
