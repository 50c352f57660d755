//! Column codecs shared by the row mappers.
//!
//! Conversion failures surface as `FromSqlConversionFailure` carrying the
//! column index, so a corrupt row names the column that broke it.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use uuid::Uuid;

use alertline_shared::GeoPoint;

/// Current time truncated to the stored precision, so a freshly built record
/// compares equal to its persisted copy.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Canonical timestamp encoding: RFC-3339, UTC, microsecond precision. A fixed
/// width keeps lexical and chronological order identical.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn uuid_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn opt_uuid_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn timestamp_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_failure(idx, e))
}

/// Parse a text column into one of the shared enums.
pub(crate) fn enum_at<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s: String = row.get(idx)?;
    s.parse::<T>().map_err(|e| conversion_failure(idx, e))
}

/// Read a `(longitude, latitude)` column pair starting at `idx`.
pub(crate) fn point_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<GeoPoint> {
    let lng: f64 = row.get(idx)?;
    let lat: f64 = row.get(idx + 1)?;
    GeoPoint::new(lng, lat).map_err(|e| conversion_failure(idx, e))
}

/// Like [`point_at`] for nullable columns; both halves must be present.
pub(crate) fn opt_point_at(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<GeoPoint>> {
    let lng: Option<f64> = row.get(idx)?;
    let lat: Option<f64> = row.get(idx + 1)?;
    match (lng, lat) {
        (Some(lng), Some(lat)) => GeoPoint::new(lng, lat)
            .map(Some)
            .map_err(|e| conversion_failure(idx, e)),
        _ => Ok(None),
    }
}

fn conversion_failure<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}
