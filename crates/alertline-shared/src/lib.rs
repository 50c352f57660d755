//! # alertline-shared
//!
//! Domain vocabulary shared by the store and the HTTP server: roles, incident
//! types, report statuses, GeoJSON points, input validation, great-circle
//! geometry, and relative-time formatting.

pub mod constants;
pub mod error;
pub mod geodesy;
pub mod relative_time;
pub mod types;
pub mod validation;

pub use error::ValidationError;
pub use types::{GeoPoint, IncidentType, ReportStatus, Role};
