/// Application name
pub const APP_NAME: &str = "Alertline";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Minimum report description length in characters
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Username length bounds (inclusive)
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 20;

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// bcrypt work factor used when none is configured
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Bearer token lifetime in seconds (1 hour)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Radius used by proximity queries when the caller gives none (5 km)
pub const DEFAULT_SEARCH_RADIUS_METERS: f64 = 5000.0;

/// Mean Earth radius in meters (IUGG), used for bounding boxes
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Maximum image upload size in bytes (10 MiB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Image extensions accepted for report photos
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

/// Cookie carrying the bearer token for browser clients
pub const TOKEN_COOKIE_NAME: &str = "token";

/// Relative path prefix recorded for stored report images
pub const UPLOADS_URL_PREFIX: &str = "uploads";
