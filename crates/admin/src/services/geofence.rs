//! Check-in geofence.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance in metres (haversine).
#[must_use]
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Returns true if `point` lies within `radius_m` of `center` (inclusive).
#[must_use]
pub fn within_radius(center: GeoPoint, point: GeoPoint, radius_m: f64) -> bool {
    distance_m(center, point) <= radius_m
}

/// Result of a geofence check, as reported to the console.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeofenceCheck {
    pub distance_m: f64,
    pub radius_m: f64,
    pub within: bool,
}

impl GeofenceCheck {
    #[must_use]
    pub fn evaluate(center: GeoPoint, point: GeoPoint, radius_m: f64) -> Self {
        let distance = distance_m(center, point);
        Self {
            distance_m: distance,
            radius_m,
            within: distance <= radius_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = GeoPoint::new(13.7563, 100.5018);
        assert!(distance_m(p, p).abs() < f64::EPSILON);
        assert!(within_radius(p, p, 0.0));
    }

    #[test]
    fn test_one_degree_latitude() {
        let d = distance_m(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_radius_boundary() {
        let center = GeoPoint::new(13.7563, 100.5018);
        // About 95 m north.
        let near = GeoPoint::new(13.7563 + 0.000_85, 100.5018);
        let check = GeofenceCheck::evaluate(center, near, 100.0);
        assert!(check.within, "distance {}", check.distance_m);
        assert!(!within_radius(center, near, 90.0));
    }
}
