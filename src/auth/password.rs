//! Password hashing and verification using Argon2id

use crate::{config::SecurityConfig, error::AppError};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Password hasher with configurable parameters
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Digest verified when the account does not exist, so both paths cost the same
    dummy_hash: OnceCell<String>,
}

impl PasswordHasher {
    /// Create hasher with default parameters (OWASP recommended)
    pub fn new() -> Self {
        // m=64MiB, t=3 iterations, p=4 lanes
        Self::build(65536, 3, 4).unwrap_or_else(|_| Self::with_argon2(Argon2::default()))
    }

    /// Create hasher from the security section of the configuration
    pub fn from_config(security: &SecurityConfig) -> Result<Self, AppError> {
        Self::build(
            security.argon2_memory_kib,
            security.argon2_iterations,
            security.argon2_parallelism,
        )
    }

    fn build(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AppError::Config(format!("Invalid Argon2 params: {}", e)))?;

        Ok(Self::with_argon2(Argon2::new(Algorithm::Argon2id, Version::V0x13, params)))
    }

    fn with_argon2(argon2: Argon2<'static>) -> Self {
        Self {
            argon2,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Hash a password
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::Internal(format!("Failed to hash password: {}", e))
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a stored digest.
    ///
    /// A digest that cannot be parsed never matches.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Failed to parse password hash: {:?}", e);
                return false;
            }
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Burn one verification for an unknown account. Always returns false.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.hash("dummy-password-for-timing"));

        match dummy {
            Ok(hash) => {
                let _ = self.verify(password, hash);
            }
            Err(e) => tracing::warn!("Failed to prepare dummy hash: {}", e),
        }

        false
    }

    /// `hash` on the blocking pool
    pub async fn hash_blocking(self: &Arc<Self>, password: String) -> Result<String, AppError> {
        let hasher = Arc::clone(self);
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }

    /// `verify` on the blocking pool
    pub async fn verify_blocking(
        self: &Arc<Self>,
        password: String,
        hash: String,
    ) -> Result<bool, AppError> {
        let hasher = Arc::clone(self);
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?)
    }

    /// `verify_dummy` on the blocking pool
    pub async fn verify_dummy_blocking(self: &Arc<Self>, password: String) -> Result<bool, AppError> {
        let hasher = Arc::clone(self);
        Ok(tokio::task::spawn_blocking(move || hasher.verify_dummy(&password)).await?)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 测试使用低开销参数
    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::build(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let password = "TestPassword123!";

        let hash = hasher.hash(password).unwrap();
        assert!(hasher.verify(password, &hash));
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_verify_fails_with_wrong_password() {
        let hasher = fast_hasher();

        let hash = hasher.hash("TestPassword123!").unwrap();
        assert!(!hasher.verify("WrongPassword", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn test_hash_is_different_each_time() {
        let hasher = fast_hasher();
        let password = "TestPassword123!";

        let hash1 = hasher.hash(password).unwrap();
        let hash2 = hasher.hash(password).unwrap();

        // 盐不同，摘要不同
        assert_ne!(hash1, hash2);
        assert!(hasher.verify(password, &hash1));
        assert!(hasher.verify(password, &hash2));
    }

    #[test]
    fn test_malformed_digest_never_matches() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("anything", "not-a-phc-string"));
        assert!(!hasher.verify("anything", ""));
    }

    #[test]
    fn test_dummy_verification_is_always_false() {
        let hasher = fast_hasher();
        assert!(!hasher.verify_dummy("dummy-password-for-timing"));
        assert!(!hasher.verify_dummy("Secret123"));
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let hasher = Arc::new(fast_hasher());

        let hash = hasher.hash_blocking("Secret123".to_string()).await.unwrap();
        assert!(hasher
            .verify_blocking("Secret123".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!hasher.verify_blocking("Secret124".to_string(), hash).await.unwrap());
        assert!(!hasher.verify_dummy_blocking("Secret123".to_string()).await.unwrap());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordHasher::build(1, 0, 0);
        assert!(result.is_err());
    }
}
