//! Database initialization
//!
//! Opens (creating if needed) the SQLite database that backs the sqlite
//! submission store and creates the responses table. Every statement is
//! idempotent, so this runs on every startup.

use crate::{Error, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create the responses table if needed
pub async fn init_database(db_path: &Path, table: &str) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the dashboard read while a submission is being written
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_responses_table(&pool, table).await?;

    Ok(pool)
}

/// Create the submissions table and its indexes
pub async fn create_responses_table(pool: &SqlitePool, table: &str) -> Result<()> {
    validate_table_name(table)?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL CHECK (length(trim(first_name)) > 0),
            last_name TEXT NOT NULL CHECK (length(trim(last_name)) > 0),
            dob TEXT,
            company TEXT NOT NULL,
            employment_status INTEGER NOT NULL,
            intro_audio_played INTEGER NOT NULL DEFAULT 0,
            employment_audio_played INTEGER NOT NULL DEFAULT 0,
            total_audio_listen_time_seconds INTEGER NOT NULL DEFAULT 0
                CHECK (total_audio_listen_time_seconds >= 0),
            intro_audio_completion_time TEXT,
            employment_audio_completion_time TEXT,
            form_start_time TEXT NOT NULL,
            form_completion_time TEXT NOT NULL,
            form_completion_time_seconds INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table}(created_at)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_company ON {table}(company)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// Table names are interpolated into SQL, so only plain identifiers pass
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid table name: {:?}", table)))
    }
}
