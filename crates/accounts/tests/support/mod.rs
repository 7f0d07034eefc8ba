#![allow(dead_code)]

use hana_accounts::{Authenticator, PasswordHasher, TokenService, UserRegistry};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

/// One connection only: every connection to `sqlite::memory:` is a separate database.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

pub async fn registry() -> UserRegistry {
    UserRegistry::new(memory_pool().await, PasswordHasher::default())
        .await
        .unwrap()
}

pub async fn authenticator() -> Authenticator {
    let registry = Arc::new(registry().await);
    let tokens = Arc::new(TokenService::new("test-secret", 3600).unwrap());
    Authenticator::new(registry, tokens)
}
