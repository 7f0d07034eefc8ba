use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;
use hana_models::HanaError;
use tracing::warn;

/// Argon2id password hashing with an upper bound on password length.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    max_password_bytes: usize,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(72)
    }
}

impl PasswordHasher {
    pub fn new(max_password_bytes: usize) -> Self {
        Self { max_password_bytes }
    }

    pub fn max_password_bytes(&self) -> usize {
        self.max_password_bytes
    }

    pub fn check_length(&self, password: &str) -> Result<(), HanaError> {
        if password.len() > self.max_password_bytes {
            return Err(HanaError::PasswordTooLong {
                max: self.max_password_bytes,
            });
        }
        Ok(())
    }

    /// Returns a PHC string (`$argon2id$v=19$...`) with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, HanaError> {
        self.check_length(password)?;
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HanaError::PasswordHash { reason: e.to_string() })
    }

    /// Mismatches, oversized passwords and unparseable stored hashes all verify as false.
    /// Bcrypt hashes written by the earlier service are still accepted.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        if self.check_length(password).is_err() {
            return false;
        }
        if is_bcrypt_hash(stored_hash) {
            return match bcrypt::verify(password, stored_hash) {
                Ok(valid) => valid,
                Err(e) => {
                    warn!("Stored bcrypt hash could not be checked: {}", e);
                    false
                }
            };
        }
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash could not be parsed: {}", e);
                return false;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// True for anything that is not an argon2 PHC string, i.e. legacy bcrypt hashes.
    pub fn needs_rehash(&self, stored_hash: &str) -> bool {
        !stored_hash.starts_with("$argon2")
    }

    /// Hashing is CPU-bound; keep it off the async workers.
    pub async fn hash_blocking(&self, password: String) -> Result<String, HanaError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| HanaError::Internal { reason: e.to_string() })?
    }

    pub async fn verify_blocking(&self, password: String, stored_hash: String) -> bool {
        let hasher = self.clone();
        match tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash)).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Password verification task failed: {}", e);
                false
            }
        }
    }
}

fn is_bcrypt_hash(stored_hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| stored_hash.starts_with(prefix))
}
