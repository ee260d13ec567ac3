//! Database initialization
//!
//! Creates the SQLite pool, the `codes` and `settings` tables, and the
//! default settings. Safe to call on every startup: all schema work is
//! idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers with one writer; submissions and
    // queries from different users overlap freely.
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Connect to an in-memory database and create the schema
///
/// The pool is capped at a single connection: each SQLite `:memory:`
/// connection is its own database, so a larger pool would hand out
/// empty databases. Intended for tests.
pub async fn connect_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_codes_table(pool).await?;
    create_settings_table(pool).await?;
    Ok(())
}

/// Create the codes table
///
/// One row per unique ticketing code. The code string itself is the key;
/// several codes may map to the same (vehicle_kind, vehicle_name).
async fn create_codes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS codes (
            code TEXT PRIMARY KEY,
            vehicle_kind TEXT NOT NULL CHECK (vehicle_kind IN ('bus', 'train', 'ropeway')),
            vehicle_name TEXT NOT NULL,
            persist INTEGER NOT NULL DEFAULT 0,
            confirms INTEGER NOT NULL DEFAULT 0,
            submitted_by TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            CHECK (confirms >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Query path looks records up by vehicle, not by code
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_codes_vehicle ON codes(vehicle_kind, vehicle_name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores service configuration key-value pairs.
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist; NULL values are reset to their
/// defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Crowdsourcing policy
    ensure_setting(pool, "confidence_threshold", "2").await?;
    ensure_setting(pool, "grace_interval_ms", "3600000").await?; // 1 hour
    ensure_setting(pool, "privileged_users", "").await?; // ';'-separated user names

    // Store and session housekeeping
    ensure_setting(pool, "store_timeout_ms", "5000").await?;
    ensure_setting(pool, "session_idle_timeout_ms", "900000").await?; // 15 minutes

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read a single setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}
