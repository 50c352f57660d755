//! CRUD and lifecycle operations for [`Report`] records.

use rusqlite::{params, params_from_iter};
use uuid::Uuid;

use alertline_shared::geodesy::BoundingBox;
use alertline_shared::{GeoPoint, ReportStatus};

use crate::columns::{encode_timestamp, enum_at, now, opt_uuid_at, point_at, timestamp_at, uuid_at};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{NewReport, Report, ReportLocation, ReportPatch};
use crate::proximity::{bbox_params, nearest_first, BBOX_PREDICATE};

const REPORT_COLUMNS: &str = "id, type, description, longitude, latitude, image_url, status, \
                              user_id, verified_by, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Persist a new report in the `pending` state.
    pub fn create_report(&self, new: &NewReport) -> Result<Report> {
        let created_at = now();
        let report = Report {
            id: Uuid::new_v4(),
            incident_type: new.incident_type,
            description: new.description.clone(),
            location: new.location,
            image_url: new.image_url.clone(),
            status: ReportStatus::Pending,
            user_id: new.user_id,
            verified_by: None,
            created_at,
            updated_at: created_at,
        };

        self.conn().execute(
            "INSERT INTO reports (id, type, description, longitude, latitude, image_url,
                                  status, user_id, verified_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?9)",
            params![
                report.id.to_string(),
                report.incident_type.as_str(),
                report.description,
                report.location.longitude(),
                report.location.latitude(),
                report.image_url,
                report.status.as_str(),
                report.user_id.map(|u| u.to_string()),
                encode_timestamp(&report.created_at),
            ],
        )?;

        Ok(report)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_report(&self, id: Uuid) -> Result<Report> {
        let report = self.conn().query_row(
            &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
            params![id.to_string()],
            row_to_report,
        )?;
        Ok(report)
    }

    /// All reports in insertion order.
    pub fn list_reports(&self) -> Result<Vec<Report>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map([], row_to_report)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Id, type, point, and creation time of every report, in insertion
    /// order.
    pub fn list_report_locations(&self) -> Result<Vec<ReportLocation>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, type, longitude, latitude, created_at
             FROM reports ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ReportLocation {
                id: uuid_at(row, 0)?,
                incident_type: enum_at(row, 1)?,
                location: point_at(row, 2)?,
                created_at: timestamp_at(row, 4)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Reports within `radius_meters` of `center`, nearest first.
    pub fn reports_near(&self, center: &GeoPoint, radius_meters: f64) -> Result<Vec<Report>> {
        let bbox = BoundingBox::around(center, radius_meters);
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE {BBOX_PREDICATE}"
        ))?;
        let candidates = stmt
            .query_map(params_from_iter(bbox_params(&bbox)), row_to_report)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(nearest_first(candidates, center, radius_meters, |r| {
            Some(r.location)
        }))
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite the status. Any state may follow any other.
    pub fn set_report_status(&self, id: Uuid, status: ReportStatus) -> Result<Report> {
        let affected = self.conn().execute(
            "UPDATE reports SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), encode_timestamp(&now()), id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_report(id)
    }

    /// Mark a report `verified` and stamp the verifier. Repeating the call
    /// overwrites the previous verifier.
    pub fn verify_report(&self, id: Uuid, verifier: Uuid) -> Result<Report> {
        let affected = self.conn().execute(
            "UPDATE reports SET status = ?1, verified_by = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                ReportStatus::Verified.as_str(),
                verifier.to_string(),
                encode_timestamp(&now()),
                id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_report(id)
    }

    /// Apply the fields present in `patch`; absent fields keep their value.
    pub fn update_report(&self, id: Uuid, patch: &ReportPatch) -> Result<Report> {
        let affected = self.conn().execute(
            "UPDATE reports SET
                 type        = COALESCE(?1, type),
                 description = COALESCE(?2, description),
                 status      = COALESCE(?3, status),
                 longitude   = COALESCE(?4, longitude),
                 latitude    = COALESCE(?5, latitude),
                 updated_at  = ?6
             WHERE id = ?7",
            params![
                patch.incident_type.map(|t| t.as_str()),
                patch.description,
                patch.status.map(|s| s.as_str()),
                patch.location.map(|p| p.longitude()),
                patch.location.map(|p| p.latitude()),
                encode_timestamp(&now()),
                id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_report(id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Hard delete, returning the removed record so callers can clean up its
    /// image.
    pub fn delete_report(&self, id: Uuid) -> Result<Report> {
        let report = self.get_report(id)?;
        self.conn()
            .execute("DELETE FROM reports WHERE id = ?1", params![id.to_string()])?;
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: uuid_at(row, 0)?,
        incident_type: enum_at(row, 1)?,
        description: row.get(2)?,
        location: point_at(row, 3)?,
        image_url: row.get(5)?,
        status: enum_at(row, 6)?,
        user_id: opt_uuid_at(row, 7)?,
        verified_by: opt_uuid_at(row, 8)?,
        created_at: timestamp_at(row, 9)?,
        updated_at: timestamp_at(row, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertline_shared::IncidentType;

    fn new_report(incident_type: IncidentType, lng: f64, lat: f64) -> NewReport {
        NewReport {
            incident_type,
            description: "Smoke rising near the market square".into(),
            location: GeoPoint::new(lng, lat).unwrap(),
            image_url: Some("uploads/photo.jpeg".into()),
            user_id: None,
        }
    }

    #[test]
    fn test_create_starts_pending_and_round_trips_coordinates() {
        let db = Database::open_in_memory().unwrap();
        let report = db
            .create_report(&new_report(IncidentType::Fire, 85.32, 27.70))
            .unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.verified_by, None);

        let fetched = db.get_report(report.id).unwrap();
        assert_eq!(fetched.location.coordinates(), [85.32, 27.70]);
        assert_eq!(fetched, report);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let a = db
            .create_report(&new_report(IncidentType::Flood, 85.0, 27.0))
            .unwrap();
        let b = db
            .create_report(&new_report(IncidentType::Fire, 84.0, 28.0))
            .unwrap();
        let c = db
            .create_report(&new_report(IncidentType::Other, 83.0, 26.0))
            .unwrap();

        let ids: Vec<Uuid> = db.list_reports().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn test_verify_twice_overwrites_verifier() {
        let db = Database::open_in_memory().unwrap();
        let report = db
            .create_report(&new_report(IncidentType::Accident, 85.0, 27.0))
            .unwrap();

        let first_admin = Uuid::new_v4();
        let second_admin = Uuid::new_v4();

        let once = db.verify_report(report.id, first_admin).unwrap();
        assert_eq!(once.status, ReportStatus::Verified);
        assert_eq!(once.verified_by, Some(first_admin));

        let twice = db.verify_report(report.id, second_admin).unwrap();
        assert_eq!(twice.status, ReportStatus::Verified);
        assert_eq!(twice.verified_by, Some(second_admin));
    }

    #[test]
    fn test_status_is_free_form_between_states() {
        let db = Database::open_in_memory().unwrap();
        let report = db
            .create_report(&new_report(IncidentType::Police, 85.0, 27.0))
            .unwrap();

        for status in [
            ReportStatus::Solved,
            ReportStatus::Pending,
            ReportStatus::Working,
            ReportStatus::Verified,
        ] {
            let updated = db.set_report_status(report.id, status).unwrap();
            assert_eq!(updated.status, status);
        }
        // plain status writes never stamp a verifier
        assert_eq!(db.get_report(report.id).unwrap().verified_by, None);
    }

    #[test]
    fn test_partial_update_keeps_absent_fields() {
        let db = Database::open_in_memory().unwrap();
        let report = db
            .create_report(&new_report(IncidentType::Landslide, 85.0, 27.0))
            .unwrap();

        let patch = ReportPatch {
            description: Some("Road blocked by debris at km 42".into()),
            location: Some(GeoPoint::new(84.5, 28.1).unwrap()),
            ..Default::default()
        };
        let updated = db.update_report(report.id, &patch).unwrap();

        assert_eq!(updated.incident_type, IncidentType::Landslide);
        assert_eq!(updated.status, ReportStatus::Pending);
        assert_eq!(updated.description, "Road blocked by debris at km 42");
        assert_eq!(updated.location.coordinates(), [84.5, 28.1]);
        assert!(updated.updated_at >= report.updated_at);
    }

    #[test]
    fn test_missing_report_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        assert!(matches!(db.get_report(id), Err(StoreError::NotFound)));
        assert!(matches!(
            db.set_report_status(id, ReportStatus::Solved),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.verify_report(id, Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.update_report(id, &ReportPatch::default()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(db.delete_report(id), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_delete_returns_removed_report() {
        let db = Database::open_in_memory().unwrap();
        let report = db
            .create_report(&new_report(IncidentType::Fire, 85.0, 27.0))
            .unwrap();

        let removed = db.delete_report(report.id).unwrap();
        assert_eq!(removed.image_url.as_deref(), Some("uploads/photo.jpeg"));
        assert!(db.list_reports().unwrap().is_empty());
    }

    #[test]
    fn test_locations_and_proximity() {
        let db = Database::open_in_memory().unwrap();
        let mid = db
            .create_report(&new_report(IncidentType::Flood, 85.3400, 27.7300))
            .unwrap();
        let near = db
            .create_report(&new_report(IncidentType::Fire, 85.3250, 27.7180))
            .unwrap();
        db.create_report(&new_report(IncidentType::Other, 83.4600, 27.7000))
            .unwrap();

        let locations = db.list_report_locations().unwrap();
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0].id, mid.id);
        assert_eq!(locations[0].incident_type, IncidentType::Flood);

        let center = GeoPoint::new(85.3240, 27.7172).unwrap();
        let ids: Vec<Uuid> = db
            .reports_near(&center, 5_000.0)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![near.id, mid.id]);
    }
}
