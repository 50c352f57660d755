//! CRUD operations for [`Alert`] records.

use rusqlite::params;
use uuid::Uuid;

use crate::columns::{encode_timestamp, enum_at, now, timestamp_at, uuid_at};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Alert, AlertPatch, NewAlert};

const ALERT_COLUMNS: &str = "id, title, description, type, location, timestamp, created_by";

impl Database {
    pub fn create_alert(&self, new: &NewAlert) -> Result<Alert> {
        let alert = Alert {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            description: new.description.clone(),
            incident_type: new.incident_type,
            location: new.location.clone(),
            timestamp: now(),
            created_by: new.created_by,
        };

        self.conn().execute(
            "INSERT INTO alerts (id, title, description, type, location, timestamp, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                alert.id.to_string(),
                alert.title,
                alert.description,
                alert.incident_type.as_str(),
                alert.location,
                encode_timestamp(&alert.timestamp),
                alert.created_by.to_string(),
            ],
        )?;

        Ok(alert)
    }

    pub fn get_alert(&self, id: Uuid) -> Result<Alert> {
        let alert = self.conn().query_row(
            &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
            params![id.to_string()],
            row_to_alert,
        )?;
        Ok(alert)
    }

    /// All alerts, newest first. Ties fall back to reverse insertion order.
    pub fn list_alerts(&self) -> Result<Vec<Alert>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts ORDER BY timestamp DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([], row_to_alert)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Apply the fields present in `patch`. The creation timestamp and
    /// creator never change.
    pub fn update_alert(&self, id: Uuid, patch: &AlertPatch) -> Result<Alert> {
        let affected = self.conn().execute(
            "UPDATE alerts SET
                 title       = COALESCE(?1, title),
                 description = COALESCE(?2, description),
                 type        = COALESCE(?3, type),
                 location    = COALESCE(?4, location)
             WHERE id = ?5",
            params![
                patch.title,
                patch.description,
                patch.incident_type.map(|t| t.as_str()),
                patch.location,
                id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_alert(id)
    }

    pub fn delete_alert(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM alerts WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

fn row_to_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    Ok(Alert {
        id: uuid_at(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        incident_type: enum_at(row, 3)?,
        location: row.get(4)?,
        timestamp: timestamp_at(row, 5)?,
        created_by: uuid_at(row, 6)?,
    })
}
