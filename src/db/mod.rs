//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for live resources and their version
//! history. The UNIQUE constraint on (resource_type, resource_id, version)
//! is what turns a racing duplicate version number into a retryable
//! CONFLICT instead of a silent gap or overwrite.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Live resources with embedded lock state. Domain fields live in a JSON
    // column; which of them are versioned is decided by the registry.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resources (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            fields TEXT NOT NULL DEFAULT '{}',
            is_locked INTEGER NOT NULL DEFAULT 0,
            locked_by_id TEXT,
            locked_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only version history. Rows are never updated or deleted.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resource_versions (
            id TEXT PRIMARY KEY,
            resource_type TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            version INTEGER NOT NULL,
            snapshot TEXT NOT NULL,
            diff TEXT,
            change_type TEXT NOT NULL,
            change_note TEXT,
            label TEXT NOT NULL,
            created_by TEXT NOT NULL,
            workspace_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(resource_type, resource_id, version)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_resources_workspace ON resources(workspace_id, resource_type);
        CREATE INDEX IF NOT EXISTS idx_versions_resource ON resource_versions(resource_type, resource_id, version);
        CREATE INDEX IF NOT EXISTS idx_versions_workspace ON resource_versions(workspace_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
