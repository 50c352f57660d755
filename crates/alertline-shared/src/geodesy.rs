//! Great-circle helpers for proximity queries.
//!
//! A query first narrows candidates with [`BoundingBox::around`] (cheap, index
//! friendly) and then keeps only the ones whose [`distance_meters`] is within
//! the radius.

use geo::{HaversineDistance, Point};

use crate::constants::EARTH_RADIUS_METERS;
use crate::types::GeoPoint;

/// Haversine distance between two positions, in meters.
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let a = Point::new(a.longitude(), a.latitude());
    let b = Point::new(b.longitude(), b.latitude());
    a.haversine_distance(&b)
}

/// Axis-aligned lng/lat box that contains every point within a radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

impl BoundingBox {
    pub fn around(center: &GeoPoint, radius_meters: f64) -> Self {
        let radius = radius_meters.max(0.0);
        let lat_delta = (radius / EARTH_RADIUS_METERS).to_degrees();

        let min_latitude = center.latitude() - lat_delta;
        let max_latitude = center.latitude() + lat_delta;

        // Boxes touching a pole or wrapping the antimeridian cover every
        // longitude.
        if min_latitude <= -90.0 || max_latitude >= 90.0 {
            return Self {
                min_longitude: -180.0,
                max_longitude: 180.0,
                min_latitude: min_latitude.max(-90.0),
                max_latitude: max_latitude.min(90.0),
            };
        }

        let lng_delta =
            (radius / (EARTH_RADIUS_METERS * center.latitude().to_radians().cos())).to_degrees();
        let mut min_longitude = center.longitude() - lng_delta;
        let mut max_longitude = center.longitude() + lng_delta;
        if min_longitude < -180.0 || max_longitude > 180.0 {
            min_longitude = -180.0;
            max_longitude = 180.0;
        }

        Self {
            min_longitude,
            max_longitude,
            min_latitude,
            max_latitude,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_longitude..=self.max_longitude).contains(&point.longitude())
            && (self.min_latitude..=self.max_latitude).contains(&point.latitude())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kathmandu() -> GeoPoint {
        GeoPoint::new(85.3240, 27.7172).unwrap()
    }

    #[test]
    fn test_distance_kathmandu_to_lalitpur() {
        let lalitpur = GeoPoint::new(85.3206, 27.6588).unwrap();
        let d = distance_meters(&kathmandu(), &lalitpur);
        // roughly 6.5 km apart
        assert!((6_000.0..7_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_meters(&kathmandu(), &kathmandu()), 0.0);
    }

    #[test]
    fn test_bounding_box_contains_points_within_radius() {
        let center = kathmandu();
        let bbox = BoundingBox::around(&center, 5_000.0);
        assert!(bbox.contains(&center));

        let near = GeoPoint::new(85.3400, 27.7300).unwrap();
        assert!(distance_meters(&center, &near) < 5_000.0);
        assert!(bbox.contains(&near));

        let far = GeoPoint::new(83.4600, 27.7000).unwrap(); // Butwal
        assert!(!bbox.contains(&far));
    }

    #[test]
    fn test_bounding_box_near_antimeridian_spans_all_longitudes() {
        let center = GeoPoint::new(179.99, 0.0).unwrap();
        let bbox = BoundingBox::around(&center, 10_000.0);
        assert_eq!(bbox.min_longitude, -180.0);
        assert_eq!(bbox.max_longitude, 180.0);
    }
}
