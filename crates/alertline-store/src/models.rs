//! Domain records persisted in SQLite.
//!
//! Every struct derives `Serialize` so the HTTP layer can return it as-is.
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use alertline_shared::{GeoPoint, IncidentType, ReportStatus, Role};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered principal. The phone number is the unique login key.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub phone_number: String,
    /// bcrypt hash. Never leaves the server.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`crate::Database::create_user`]. The password must already be
/// hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub phone_number: String,
    pub password_hash: String,
    pub location: Option<GeoPoint>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A citizen-submitted incident.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub description: String,
    pub location: GeoPoint,
    pub image_url: Option<String>,
    pub status: ReportStatus,
    /// Submitter, when the report was filed with a valid token.
    pub user_id: Option<Uuid>,
    pub verified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub incident_type: IncidentType,
    pub description: String,
    pub location: GeoPoint,
    pub image_url: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Partial edit; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ReportPatch {
    pub incident_type: Option<IncidentType>,
    pub description: Option<String>,
    pub status: Option<ReportStatus>,
    pub location: Option<GeoPoint>,
}

/// Minimal projection used to plot reports on a map.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLocation {
    pub id: Uuid,
    pub incident_type: IncidentType,
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// A staff advisory. `location` is a free-text label, not a coordinate.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub title: String,
    pub description: String,
    pub incident_type: IncidentType,
    pub location: String,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct AlertPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub incident_type: Option<IncidentType>,
    pub location: Option<String>,
}
