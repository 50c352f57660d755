//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `users`, `reports`, and `alerts`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    username      TEXT NOT NULL,
    phone_number  TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,               -- bcrypt
    role          TEXT NOT NULL DEFAULT 'user'
                  CHECK (role IN ('user', 'admin')),
    longitude     REAL,                        -- NULL when unknown
    latitude      REAL,
    created_at    TEXT NOT NULL                -- RFC-3339, UTC
);

CREATE INDEX IF NOT EXISTS idx_users_location ON users(latitude, longitude);

-- ----------------------------------------------------------------
-- Reports
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS reports (
    id          TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    type        TEXT NOT NULL
                CHECK (type IN ('fire', 'police', 'flood', 'accident', 'landslide', 'other')),
    description TEXT NOT NULL,
    longitude   REAL NOT NULL,
    latitude    REAL NOT NULL,
    image_url   TEXT,
    status      TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'verified', 'working', 'solved')),
    user_id     TEXT,                          -- loose reference, no FK
    verified_by TEXT,                          -- loose reference, no FK
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reports_location ON reports(latitude, longitude);

-- ----------------------------------------------------------------
-- Alerts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS alerts (
    id          TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    type        TEXT NOT NULL
                CHECK (type IN ('fire', 'police', 'flood', 'accident', 'landslide', 'other')),
    location    TEXT NOT NULL,                 -- free-text label
    timestamp   TEXT NOT NULL,
    created_by  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON alerts(timestamp DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
