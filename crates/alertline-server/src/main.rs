//! # alertline-server
//!
//! REST backend for citizen incident reporting.
//!
//! This binary provides:
//! - **Accounts**: registration, login with bcrypt-checked passwords, and
//!   signed bearer tokens (cookie or `Authorization` header)
//! - **Reports**: geotagged incident submissions with an optional photo,
//!   admin verification and status tracking, proximity search
//! - **Alerts**: staff advisories managed by admins
//! - **Map projection**: flattened report markers with relative times

mod access;
mod api;
mod config;
mod credentials;
mod error;
mod image_store;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use alertline_shared::constants::APP_NAME;
use alertline_shared::Role;
use alertline_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::credentials::CredentialService;
use crate::image_store::ImageStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,alertline_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env()?;
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.database_path).with_context(|| {
        format!(
            "Failed to open database at '{}'",
            config.database_path.display()
        )
    })?;

    bootstrap_admin(&db, config.bootstrap_admin_phone.as_deref())?;

    // Upload directory (created if missing)
    let images = ImageStore::new(config.upload_dir.clone(), config.max_upload_size).await?;

    let credentials = CredentialService::from_config(&config);

    let http_addr = config.http_addr;
    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        credentials,
        images: Arc::new(images),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until Ctrl+C)
    // -----------------------------------------------------------------------
    if let Err(e) = api::serve(app_state, http_addr).await {
        tracing::error!(error = %e, "HTTP server failed");
        return Err(e);
    }

    info!("Server stopped");
    Ok(())
}

/// Promote the account registered under `phone` to admin, if it exists.
fn bootstrap_admin(db: &Database, phone: Option<&str>) -> anyhow::Result<()> {
    let Some(phone) = phone else {
        return Ok(());
    };

    match db.find_user_by_phone(phone)? {
        Some(user) if user.role == Role::Admin => {
            info!(id = %user.id, "Bootstrap admin already promoted");
        }
        Some(user) => {
            db.set_user_role(user.id, Role::Admin)?;
            info!(id = %user.id, "Promoted bootstrap admin");
        }
        None => {
            warn!("BOOTSTRAP_ADMIN_PHONE does not match any account; register it and restart");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertline_store::NewUser;

    #[test]
    fn test_bootstrap_admin_promotes_existing_account() {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .create_user(&NewUser {
                username: "operator".into(),
                phone_number: "9800000000".into(),
                password_hash: "$2b$04$placeholder".into(),
                location: None,
            })
            .unwrap();

        bootstrap_admin(&db, None).unwrap();
        assert_eq!(db.get_user(user.id).unwrap().role, Role::User);

        bootstrap_admin(&db, Some("9811111111")).unwrap();
        assert_eq!(db.get_user(user.id).unwrap().role, Role::User);

        bootstrap_admin(&db, Some("9800000000")).unwrap();
        assert_eq!(db.get_user(user.id).unwrap().role, Role::Admin);
    }
}
