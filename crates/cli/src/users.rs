use anyhow::Result;
use hana_accounts::{open_pool, PasswordHasher, UserRegistry};
use hana_models::Role;
use tracing::info;

pub async fn open(db_url: &str, max_password_bytes: usize) -> Result<UserRegistry> {
    let pool = open_pool(db_url).await?;
    let registry = UserRegistry::new(pool, PasswordHasher::new(max_password_bytes)).await?;
    info!("Opened user database {}", db_url);
    Ok(registry)
}

pub async fn add(registry: &UserRegistry, name: &str, password: &str, admin: bool) -> Result<()> {
    let role = if admin { Role::Admin } else { Role::User };
    let user = registry.create_user(name, password, role).await?;
    println!("Created {} ({})", user.name, user.role);
    Ok(())
}

pub async fn promote(registry: &UserRegistry, name: &str) -> Result<()> {
    registry.promote(name).await?;
    println!("{name} promoted");
    Ok(())
}

pub async fn delete(registry: &UserRegistry, name: &str) -> Result<()> {
    registry.delete_user(name).await?;
    println!("{name} deleted");
    Ok(())
}

pub async fn list(registry: &UserRegistry) -> Result<Vec<String>> {
    Ok(registry
        .list_users()
        .await?
        .into_iter()
        .map(|user| format!("{}\t{}\t{}", user.name, user.role, user.created_at.format("%Y-%m-%d")))
        .collect())
}
