use crate::migrations::run_migrations;
use crate::password::PasswordHasher;
use chrono::Utc;
use hana_models::{HanaError, Role, User};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const MAX_USER_NAME_CHARS: usize = 64;

/// Opens (creating if needed) the SQLite database behind `db_url`.
pub async fn open_pool(db_url: &str) -> Result<SqlitePool, HanaError> {
    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

pub struct UserRegistry {
    pool: SqlitePool,
    hasher: PasswordHasher,
}

impl UserRegistry {
    pub async fn new(pool: SqlitePool, hasher: PasswordHasher) -> Result<Self, HanaError> {
        run_migrations(&pool).await?;
        Ok(Self { pool, hasher })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    #[instrument(skip(self, password))]
    pub async fn create_user(&self, name: &str, password: &str, role: Role) -> Result<User, HanaError> {
        validate_user_name(name)?;
        self.hasher.check_length(password)?;

        let hash = self.hasher.hash_blocking(password.to_string()).await?;
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            role,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            "INSERT INTO users (id, name, hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!("Created user: {} ({})", user.name, user.role);
                Ok(user)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(HanaError::UserAlreadyExists { name: name.to_string() })
            }
            Err(e) => Err(HanaError::Sqlx(e)),
        }
    }

    /// False for unknown users, oversized passwords and mismatched or malformed hashes.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, name: &str, password: &str) -> Result<bool, HanaError> {
        if self.hasher.check_length(password).is_err() {
            return Ok(false);
        }

        let stored: Option<Option<String>> =
            sqlx::query_scalar("SELECT hash FROM users WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        let Some(stored) = stored.flatten() else {
            return Ok(false);
        };

        let valid = self
            .hasher
            .verify_blocking(password.to_string(), stored.clone())
            .await;
        if !valid {
            warn!("Credential check failed for user: {}", name);
            return Ok(false);
        }

        if self.hasher.needs_rehash(&stored) {
            self.rehash(name, password).await;
        }
        Ok(true)
    }

    /// Replaces a legacy hash after a successful login. Failures are logged only;
    /// the old hash keeps working.
    async fn rehash(&self, name: &str, password: &str) {
        let hash = match self.hasher.hash_blocking(password.to_string()).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Could not rehash password for {}: {}", name, e);
                return;
            }
        };
        match sqlx::query("UPDATE users SET hash = ? WHERE name = ?")
            .bind(&hash)
            .bind(name)
            .execute(&self.pool)
            .await
        {
            Ok(_) => info!("Upgraded legacy password hash for user: {}", name),
            Err(e) => warn!("Could not store rehashed password for {}: {}", name, e),
        }
    }

    #[instrument(skip(self))]
    pub async fn find_user(&self, name: &str) -> Result<Option<User>, HanaError> {
        let row = sqlx::query("SELECT id, name, role, created_at FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    #[instrument(skip(self))]
    pub async fn role_of(&self, name: &str) -> Result<Option<Role>, HanaError> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        role.map(|r| parse_role(&r)).transpose()
    }

    #[instrument(skip(self))]
    pub async fn promote(&self, name: &str) -> Result<(), HanaError> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE name = ?")
            .bind(Role::Admin.as_str())
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(HanaError::UserNotFound { name: name.to_string() });
        }

        info!("Promoted user to admin: {}", name);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, name: &str) -> Result<(), HanaError> {
        let result = sqlx::query("DELETE FROM users WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(HanaError::UserNotFound { name: name.to_string() });
        }

        info!("Deleted user: {}", name);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, HanaError> {
        let rows = sqlx::query("SELECT id, name, role, created_at FROM users ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_user).collect()
    }

    /// Makes sure `name` exists with the admin role. Returns whether anything changed.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, name: &str, password: &str) -> Result<bool, HanaError> {
        match self.role_of(name).await? {
            Some(Role::Admin) => Ok(false),
            Some(Role::User) => {
                self.promote(name).await?;
                Ok(true)
            }
            None => {
                self.create_user(name, password, Role::Admin).await?;
                Ok(true)
            }
        }
    }
}

/// Names arrive as URL path segments, so slashes and control characters are refused.
pub fn validate_user_name(name: &str) -> Result<(), HanaError> {
    let invalid = name.trim().is_empty()
        || name.chars().count() > MAX_USER_NAME_CHARS
        || name.chars().any(|c| c == '/' || c.is_control());
    if invalid {
        return Err(HanaError::InvalidUserName { name: name.to_string() });
    }
    Ok(())
}

fn parse_role(raw: &str) -> Result<Role, HanaError> {
    raw.parse().map_err(|reason| HanaError::Storage { reason })
}

fn row_to_user(row: &SqliteRow) -> Result<User, HanaError> {
    let id: String = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    Ok(User {
        id: Uuid::parse_str(&id).map_err(|e| HanaError::Storage {
            reason: format!("Invalid user id {id}: {e}"),
        })?,
        name: row.try_get("name")?,
        role: parse_role(&role)?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_name_rules() {
        assert!(validate_user_name("ana").is_ok());
        assert!(validate_user_name("ana.maria-2").is_ok());
        assert!(validate_user_name("").is_err());
        assert!(validate_user_name("   ").is_err());
        assert!(validate_user_name("a/b").is_err());
        assert!(validate_user_name("tab\there").is_err());
        assert!(validate_user_name(&"x".repeat(65)).is_err());
        assert!(validate_user_name(&"x".repeat(64)).is_ok());
    }
}
