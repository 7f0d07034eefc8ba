use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Embedded migration scripts
const MIGRATION_001_USERS: &str = include_str!("../migrations/001_users.sql");
const MIGRATION_002_USERS_ROLE_INDEX: &str = include_str!("../migrations/002_users_role_index.sql");

/// Run all embedded migrations. Every step is idempotent, so this runs on each startup.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    info!("Running migration 001: Users");
    sqlx::query(MIGRATION_001_USERS).execute(pool).await?;

    info!("Running migration 001a: Upgrade legacy users table");
    upgrade_legacy_users(pool).await?;

    info!("Running migration 002: Users role index");
    sqlx::query(MIGRATION_002_USERS_ROLE_INDEX)
        .execute(pool)
        .await?;

    info!("All migrations completed successfully");
    Ok(())
}

async fn user_columns(pool: &Pool<Sqlite>) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query("PRAGMA table_info(users)").fetch_all(pool).await?;
    rows.iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect()
}

/// Brings a `users` table written by the earlier service up to the current shape:
/// adds `role` and `created_at`, fills missing ids and drops the plaintext
/// `password` column.
async fn upgrade_legacy_users(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    let columns = user_columns(pool).await?;

    if !columns.contains("role") {
        warn!("users table has no role column; adding it");
        sqlx::query("ALTER TABLE users ADD COLUMN role TEXT NOT NULL DEFAULT 'user'")
            .execute(pool)
            .await?;
    }
    sqlx::query("UPDATE users SET role = 'user' WHERE role IS NULL OR role NOT IN ('user', 'admin')")
        .execute(pool)
        .await?;

    if !columns.contains("created_at") {
        warn!("users table has no created_at column; adding it");
        sqlx::query("ALTER TABLE users ADD COLUMN created_at TEXT")
            .execute(pool)
            .await?;
    }
    sqlx::query("UPDATE users SET created_at = ? WHERE created_at IS NULL")
        .bind(Utc::now())
        .execute(pool)
        .await?;

    let missing_ids: Vec<i64> =
        sqlx::query_scalar("SELECT rowid FROM users WHERE id IS NULL OR id = ''")
            .fetch_all(pool)
            .await?;
    for rowid in missing_ids {
        sqlx::query("UPDATE users SET id = ? WHERE rowid = ?")
            .bind(Uuid::new_v4().to_string())
            .bind(rowid)
            .execute(pool)
            .await?;
    }

    if columns.contains("password") {
        warn!("Dropping plaintext password column from users table");
        sqlx::query("ALTER TABLE users DROP COLUMN password")
            .execute(pool)
            .await?;
    }

    Ok(())
}
