//! CRUD operations for [`User`] records.

use rusqlite::{params, params_from_iter, OptionalExtension};
use uuid::Uuid;

use alertline_shared::geodesy::BoundingBox;
use alertline_shared::{GeoPoint, Role};

use crate::columns::{encode_timestamp, enum_at, now, opt_point_at, timestamp_at, uuid_at};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{NewUser, User};
use crate::proximity::{bbox_params, nearest_first, BBOX_PREDICATE};

const USER_COLUMNS: &str =
    "id, username, phone_number, password_hash, role, longitude, latitude, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user with role `user`. A duplicate phone number yields
    /// [`StoreError::Conflict`].
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: new.username.clone(),
            phone_number: new.phone_number.clone(),
            password_hash: new.password_hash.clone(),
            role: Role::User,
            location: new.location,
            created_at: now(),
        };

        self.conn()
            .execute(
                "INSERT INTO users (id, username, phone_number, password_hash, role,
                                    longitude, latitude, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.id.to_string(),
                    user.username,
                    user.phone_number,
                    user.password_hash,
                    user.role.as_str(),
                    user.location.map(|p| p.longitude()),
                    user.location.map(|p| p.latitude()),
                    encode_timestamp(&user.created_at),
                ],
            )
            .map_err(|e| match StoreError::from(e) {
                StoreError::Conflict(_) => {
                    StoreError::Conflict("Phone number already registered".into())
                }
                other => other,
            })?;

        Ok(user)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, id: Uuid) -> Result<User> {
        let user = self.conn().query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.to_string()],
            row_to_user,
        )?;
        Ok(user)
    }

    pub fn find_user_by_phone(&self, phone_number: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE phone_number = ?1"),
                params![phone_number],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// All users in registration order.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid ASC"))?;
        let rows = stmt.query_map([], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    /// Users with a known location within `radius_meters` of `center`,
    /// nearest first.
    pub fn users_near(&self, center: &GeoPoint, radius_meters: f64) -> Result<Vec<User>> {
        let bbox = BoundingBox::around(center, radius_meters);
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {BBOX_PREDICATE}"
        ))?;
        let candidates = stmt
            .query_map(params_from_iter(bbox_params(&bbox)), row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(nearest_first(candidates, center, radius_meters, |u| u.location))
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    pub fn set_user_role(&self, id: Uuid, role: Role) -> Result<User> {
        let affected = self.conn().execute(
            "UPDATE users SET role = ?1 WHERE id = ?2",
            params![role.as_str(), id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Hard delete. Returns `true` if a row was deleted. Reports and alerts
    /// that reference the user are left untouched.
    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        username: row.get(1)?,
        phone_number: row.get(2)?,
        password_hash: row.get(3)?,
        role: enum_at(row, 4)?,
        location: opt_point_at(row, 5)?,
        created_at: timestamp_at(row, 7)?,
    })
}
