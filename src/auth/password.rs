// Password hashing and validation service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::auth::error::AuthError;

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Argon2id password hashing. Hashing runs on the blocking pool so it never
/// stalls other requests on the runtime.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl Default for PasswordService {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl PasswordService {
    /// Service with explicit cost parameters (memory KiB, iterations, lanes)
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, AuthError> {
        let params = Params::new(m_cost, t_cost, p_cost, None).map_err(|_| AuthError::PasswordHash)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password into a PHC string
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|_| AuthError::PasswordHash)
        })
        .await
        .map_err(|_| AuthError::PasswordHash)?
    }

    /// Verify a password against a stored PHC string
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(|_| AuthError::PasswordHash)?;
            Ok(argon2.verify_password(password.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|_| AuthError::PasswordHash)?
    }

    /// Validate password strength requirements
    pub fn validate_password_strength(password: &str) -> Result<(), String> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_service() -> PasswordService {
        PasswordService::with_params(8, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_hash_then_verify() {
        let service = fast_service();
        let hash = service.hash_password("correct horse").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify_password("correct horse", &hash).await.unwrap());
        assert!(!service.verify_password("wrong horse", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let service = fast_service();
        let a = service.hash_password("password123").await.unwrap();
        let b = service.hash_password("password123").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_is_an_error() {
        let service = fast_service();
        assert!(service.verify_password("x", "not-a-phc-string").await.is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(PasswordService::validate_password_strength("abc1234").is_err());
        assert!(PasswordService::validate_password_strength("abc12345").is_ok());
    }
}
