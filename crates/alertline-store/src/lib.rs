//! # alertline-store
//!
//! SQLite persistence for Alertline. The crate exposes a synchronous
//! `Database` handle that wraps a `rusqlite::Connection` and provides typed
//! CRUD helpers for users, reports, and alerts, plus radius queries over the
//! located ones.

pub mod alerts;
pub mod database;
pub mod migrations;
pub mod models;
pub mod reports;
pub mod users;

mod columns;
mod error;
mod proximity;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
