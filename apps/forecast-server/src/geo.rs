use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coordinates are stored as NUMERIC(10,4).
pub const COORDINATE_SCALE: f64 = 10_000.0;

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("invalid latitude or longitude")]
    Malformed,
    #[error("latitude {0} out of range")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} out of range")]
    LongitudeOutOfRange(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point rounded to the storage precision.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: quantize(latitude),
            longitude: quantize(longitude),
        }
    }

    pub fn checked(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::Malformed);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self::new(latitude, longitude))
    }

    /// Parses request strings, range-checks and quantizes them.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, CoordinateError> {
        let latitude = latitude
            .trim()
            .parse::<f64>()
            .map_err(|_| CoordinateError::Malformed)?;
        let longitude = longitude
            .trim()
            .parse::<f64>()
            .map_err(|_| CoordinateError::Malformed)?;
        Self::checked(latitude, longitude)
    }

    /// Exact key used for in-process comparisons of quantized coordinates.
    pub fn key(&self) -> (i64, i64) {
        (scaled(self.latitude), scaled(self.longitude))
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

pub fn quantize(value: f64) -> f64 {
    (value * COORDINATE_SCALE).round() / COORDINATE_SCALE
}

fn scaled(value: f64) -> i64 {
    (value * COORDINATE_SCALE).round() as i64
}

/// Parses `lat,lon;lat,lon` seed lists. Blank entries are ignored.
pub fn parse_point_list(raw: &str) -> Result<Vec<GeoPoint>, CoordinateError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (lat, lon) = entry.split_once(',').ok_or(CoordinateError::Malformed)?;
            GeoPoint::parse(lat, lon)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantizes_to_four_digits() {
        let point = GeoPoint::new(40.123_456, -75.000_049);
        assert_eq!(point.latitude, 40.1235);
        assert_eq!(point.longitude, -75.0);
        assert_eq!(point.to_string(), "40.1235,-75.0000");
    }

    #[test]
    fn parse_rejects_garbage_and_out_of_range() {
        assert_eq!(
            GeoPoint::parse("abc", "1.0"),
            Err(CoordinateError::Malformed)
        );
        assert_eq!(GeoPoint::parse("", "1.0"), Err(CoordinateError::Malformed));
        assert_eq!(
            GeoPoint::parse("NaN", "1.0"),
            Err(CoordinateError::Malformed)
        );
        assert!(matches!(
            GeoPoint::parse("91", "0"),
            Err(CoordinateError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            GeoPoint::parse("0", "-180.5"),
            Err(CoordinateError::LongitudeOutOfRange(_))
        ));
        assert_eq!(
            GeoPoint::parse(" 40.00001 ", "-75"),
            Ok(GeoPoint::new(40.0, -75.0))
        );
    }

    #[test]
    fn keys_match_after_quantization() {
        let a = GeoPoint::new(40.00001, -75.0);
        let b = GeoPoint::new(40.0, -74.99999);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), GeoPoint::new(40.0001, -75.0).key());
    }

    #[test]
    fn parses_seed_lists() {
        let points = parse_point_list("40.0,-75.0; 51.5074,-0.1278;").unwrap();
        assert_eq!(
            points,
            vec![GeoPoint::new(40.0, -75.0), GeoPoint::new(51.5074, -0.1278)]
        );
        assert!(parse_point_list("40.0").is_err());
        assert!(parse_point_list("").unwrap().is_empty());
    }
}
