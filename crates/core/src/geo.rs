//! Great-circle distances for the nearest-shop lookup.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors that can occur when constructing [`Coordinates`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum CoordinateError {
    #[error("latitude must be between -90 and 90 (got {0})")]
    Latitude(f64),
    #[error("longitude must be between -180 and 180 (got {0})")]
    Longitude(f64),
}

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Validate and create a coordinate pair.
    ///
    /// # Errors
    ///
    /// Returns an error when either value is out of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Coordinates from optional columns; `None` unless both are present and valid.
    #[must_use]
    pub fn from_optional(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Self::new(latitude?, longitude?).ok()
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Haversine distance to another point, in kilometres.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

/// The `limit` items closest to `origin`, nearest first, with their distance.
///
/// Items without coordinates are skipped.
pub fn nearest<T>(
    items: impl IntoIterator<Item = (T, Option<Coordinates>)>,
    origin: &Coordinates,
    limit: usize,
) -> Vec<(T, f64)> {
    let mut ranked: Vec<(T, f64)> = items
        .into_iter()
        .filter_map(|(item, coords)| coords.map(|c| (item, origin.distance_km(&c))))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            Coordinates::new(91.0, 0.0),
            Err(CoordinateError::Latitude(_))
        ));
        assert!(matches!(
            Coordinates::new(0.0, -181.0),
            Err(CoordinateError::Longitude(_))
        ));
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_from_optional_requires_both() {
        assert!(Coordinates::from_optional(Some(1.0), None).is_none());
        assert!(Coordinates::from_optional(Some(1.0), Some(2.0)).is_some());
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = at(55.7558, 37.6173);
        assert!(p.distance_km(&p).abs() < 1e-9);
    }

    #[test]
    fn test_distance_moscow_to_saint_petersburg() {
        let moscow = at(55.7558, 37.6173);
        let spb = at(59.9343, 30.3351);
        let d = moscow.distance_km(&spb);
        assert!((630.0..640.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_nearest_orders_and_skips_unlocated() {
        let origin = at(0.0, 0.0);
        let items = vec![
            ("far", Some(at(10.0, 10.0))),
            ("nowhere", None),
            ("near", Some(at(0.1, 0.1))),
            ("mid", Some(at(1.0, 1.0))),
        ];
        let names: Vec<&str> = nearest(items, &origin, 2)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["near", "mid"]);
    }
}
