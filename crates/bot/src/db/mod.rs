//! Database operations for the order store.
//!
//! # Database: single SQLite file
//!
//! The bot owns one embedded SQLite database. Orders are append-only; the
//! bot never updates or deletes rows (operators edit `status` out-of-band).
//!
//! ## Tables
//!
//! - `orders` - Confirmed orders (see `migrations/0001_create_orders.sql`)
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/bot/migrations/` and run at startup
//! via [`run_migrations`].

pub mod orders;

use std::path::Path;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

pub use orders::OrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a SQLite connection pool with sensible defaults.
///
/// Creates the database file if missing. WAL mode keeps reads from
/// blocking the writer; the busy timeout covers the rare write-write
/// collision between pooled connections.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database cannot be opened.
pub async fn create_pool(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create an in-memory SQLite pool.
///
/// A single never-reaped connection: each SQLite `:memory:` connection is
/// its own database, so more than one connection (or idle reaping) would
/// silently split or drop state. Used by the test suites; handy for local
/// experiments too.
///
/// # Errors
///
/// Returns `sqlx::Error` if the in-memory database cannot be opened.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// Run embedded migrations to bring the schema up to date.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails to apply.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
