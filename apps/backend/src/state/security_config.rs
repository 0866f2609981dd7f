use jsonwebtoken::Algorithm;

use crate::error::AppError;

/// Configuration for JWT security settings
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT secret key for verifying (and, in tests, signing) tokens
    pub jwt_secret: Vec<u8>,
    /// JWT algorithm to use (defaults to HS256)
    pub algorithm: Algorithm,
}

impl SecurityConfig {
    /// Create a new SecurityConfig with the given JWT secret
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            algorithm: Algorithm::HS256,
        }
    }

    /// Read `GAMEHALL_JWT_SECRET`.
    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("GAMEHALL_JWT_SECRET")
            .map_err(|_| AppError::config("GAMEHALL_JWT_SECRET must be set"))?;
        if secret.is_empty() {
            return Err(AppError::config("GAMEHALL_JWT_SECRET must not be empty"));
        }
        Ok(Self::new(secret.into_bytes()))
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::new(b"default_secret_for_tests_only".to_vec())
    }
}
