//! "Within radius R of P, nearest first" over located rows.
//!
//! Tables index `(latitude, longitude)`; callers select candidates inside the
//! [`BoundingBox`] with SQL and hand them to [`nearest_first`] for the exact
//! great-circle cut and ordering.

use alertline_shared::geodesy::{distance_meters, BoundingBox};
use alertline_shared::GeoPoint;

/// SQL predicate matching the bounding-box parameters bound by
/// [`bbox_params`], in order.
pub(crate) const BBOX_PREDICATE: &str =
    "latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4";

pub(crate) fn bbox_params(bbox: &BoundingBox) -> [f64; 4] {
    [
        bbox.min_latitude,
        bbox.max_latitude,
        bbox.min_longitude,
        bbox.max_longitude,
    ]
}

/// Keep items within `radius_meters` of `center`, sorted by ascending
/// distance. Items without a location are dropped.
pub(crate) fn nearest_first<T, F>(
    candidates: Vec<T>,
    center: &GeoPoint,
    radius_meters: f64,
    location: F,
) -> Vec<T>
where
    F: Fn(&T) -> Option<GeoPoint>,
{
    let mut hits: Vec<(f64, T)> = candidates
        .into_iter()
        .filter_map(|item| {
            let point = location(&item)?;
            let d = distance_meters(center, &point);
            (d <= radius_meters).then_some((d, item))
        })
        .collect();

    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    hits.into_iter().map(|(_, item)| item).collect()
}
