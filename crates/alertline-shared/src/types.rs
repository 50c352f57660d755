use std::fmt;
use std::str::FromStr;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Authorization level of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Incident type
// ---------------------------------------------------------------------------

/// Category shared by reports and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentType {
    Fire,
    Police,
    Flood,
    Accident,
    Landslide,
    Other,
}

impl IncidentType {
    pub const ALL: [IncidentType; 6] = [
        Self::Fire,
        Self::Police,
        Self::Flood,
        Self::Accident,
        Self::Landslide,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Police => "police",
            Self::Flood => "flood",
            Self::Accident => "accident",
            Self::Landslide => "landslide",
            Self::Other => "other",
        }
    }

    /// Capitalized name for map markers, e.g. `"Flood"`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fire => "Fire",
            Self::Police => "Police",
            Self::Flood => "Flood",
            Self::Accident => "Accident",
            Self::Landslide => "Landslide",
            Self::Other => "Other",
        }
    }
}

impl FromStr for IncidentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidIncidentType(s.to_string()))
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Report status
// ---------------------------------------------------------------------------

/// Lifecycle state of a report. Any state may be written over any other;
/// only verification also stamps the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Verified,
    Working,
    Solved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [Self::Pending, Self::Verified, Self::Working, Self::Solved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Working => "working",
            Self::Solved => "solved",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Geo point
// ---------------------------------------------------------------------------

/// A WGS84 position. On the wire it is a GeoJSON point whose coordinates are
/// ordered longitude first: `{"type": "Point", "coordinates": [lng, lat]}`.
/// Input also accepts the bare `[lng, lat]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "GeoJsonPoint")]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, ValidationError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(ValidationError::InvalidLocation(
                "coordinates must be finite numbers".into(),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::InvalidLocation(format!(
                "longitude {longitude} out of range [-180, 180]"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::InvalidLocation(format!(
                "latitude {latitude} out of range [-90, 90]"
            )));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Build from a `[lng, lat]` slice. Anything other than two elements is
    /// rejected.
    pub fn from_coordinates(coords: &[f64]) -> Result<Self, ValidationError> {
        match coords {
            [lng, lat] => Self::new(*lng, *lat),
            _ => Err(ValidationError::InvalidLocation(format!(
                "expected [longitude, latitude], got {} values",
                coords.len()
            ))),
        }
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn coordinates(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type", default = "point_kind")]
    kind: String,
    coordinates: Vec<f64>,
}

fn point_kind() -> String {
    "Point".to_string()
}

impl TryFrom<GeoJsonPoint> for GeoPoint {
    type Error = ValidationError;

    fn try_from(value: GeoJsonPoint) -> Result<Self, Self::Error> {
        if value.kind != "Point" {
            return Err(ValidationError::InvalidLocation(format!(
                "unsupported geometry type {:?}",
                value.kind
            )));
        }
        Self::from_coordinates(&value.coordinates)
    }
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PointVisitor;

        impl<'de> Visitor<'de> for PointVisitor {
            type Value = GeoPoint;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a GeoJSON point or a [longitude, latitude] array")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<GeoPoint, A::Error> {
                let mut coords = Vec::with_capacity(2);
                while let Some(value) = seq.next_element::<f64>()? {
                    coords.push(value);
                }
                GeoPoint::from_coordinates(&coords).map_err(de::Error::custom)
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<GeoPoint, A::Error> {
                let point = GeoJsonPoint::deserialize(de::value::MapAccessDeserializer::new(map))?;
                GeoPoint::try_from(point).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(PointVisitor)
    }
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: point_kind(),
            coordinates: point.coordinates().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_type_parse() {
        assert_eq!("flood".parse::<IncidentType>().unwrap(), IncidentType::Flood);
        assert!("earthquake".parse::<IncidentType>().is_err());
        assert!("Fire".parse::<IncidentType>().is_err());
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert_eq!(
            "working".parse::<ReportStatus>().unwrap(),
            ReportStatus::Working
        );
        assert_eq!(
            "closed".parse::<ReportStatus>(),
            Err(ValidationError::InvalidStatus("closed".into()))
        );
    }

    #[test]
    fn test_geo_point_wire_order() {
        let point = GeoPoint::new(85.32, 27.70).unwrap();
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "Point", "coordinates": [85.32, 27.70] })
        );

        let back: GeoPoint = serde_json::from_value(json).unwrap();
        assert_eq!(back.coordinates(), [85.32, 27.70]);
    }

    #[test]
    fn test_geo_point_rejects_bad_shapes() {
        assert!(GeoPoint::from_coordinates(&[1.0]).is_err());
        assert!(GeoPoint::from_coordinates(&[1.0, 2.0, 3.0]).is_err());
        assert!(GeoPoint::new(200.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -91.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());

        let polygon = serde_json::json!({ "type": "Polygon", "coordinates": [1.0, 2.0] });
        assert!(serde_json::from_value::<GeoPoint>(polygon).is_err());
    }

    #[test]
    fn test_geo_point_accepts_bare_pair() {
        let point: GeoPoint = serde_json::from_value(serde_json::json!([85.1, 27.6])).unwrap();
        assert_eq!(point.coordinates(), [85.1, 27.6]);

        assert!(serde_json::from_value::<GeoPoint>(serde_json::json!([85.1])).is_err());
        assert!(serde_json::from_value::<GeoPoint>(serde_json::json!([85.1, 95.0])).is_err());
        assert!(
            serde_json::from_value::<GeoPoint>(serde_json::json!(["Point", [85.1, 27.6]])).is_err()
        );
    }

    #[test]
    fn test_role_default_is_user() {
        assert_eq!(Role::default(), Role::User);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
