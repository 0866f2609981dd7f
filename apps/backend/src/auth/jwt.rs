use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::engine::UserId;
use crate::state::security_config::SecurityConfig;
use crate::AppError;

/// Claims carried by access tokens. Issuance belongs to the identity
/// service; this backend only verifies, and mints for tests and local play.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's id, as a decimal string.
    pub sub: String,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.sub
            .parse::<UserId>()
            .map_err(|_| AppError::UnauthorizedInvalidJwt)
    }
}

/// Mint a HS256 JWT access token valid for `ttl_secs`.
pub fn mint_access_token(
    user_id: UserId,
    now: SystemTime,
    ttl_secs: i64,
    security: &SecurityConfig,
) -> Result<String, AppError> {
    let iat = now
        .duration_since(UNIX_EPOCH)
        .map_err(|_| AppError::internal("Failed to get current time"))?
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id.to_string(),
        iat,
        exp: iat + ttl_secs,
    };

    encode(
        &Header::new(security.algorithm),
        &claims,
        &EncodingKey::from_secret(&security.jwt_secret),
    )
    .map_err(|e| AppError::internal(format!("Failed to encode JWT: {e}")))
}

/// Verify a token and return its claims. Expired, forged and malformed
/// tokens all come back as `UnauthorizedInvalidJwt`.
pub fn verify_access_token(token: &str, security: &SecurityConfig) -> Result<Claims, AppError> {
    // Default Validation already checks exp; pin algorithm to configured algorithm.
    let validation = Validation::new(security.algorithm);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(&security.jwt_secret),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!(reason = ?e.kind(), "access token rejected");
        AppError::UnauthorizedInvalidJwt
    })
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::{mint_access_token, verify_access_token};
    use crate::state::security_config::SecurityConfig;
    use crate::AppError;

    #[test]
    fn test_mint_and_verify_roundtrip() {
        let security = SecurityConfig::new("test_secret_key_for_testing_purposes_only".as_bytes());
        let token = mint_access_token(42, SystemTime::now(), 900, &security).unwrap();
        let claims = verify_access_token(&token, &security).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.exp, claims.iat + 900);
    }

    #[test]
    fn test_expired_token() {
        let security = SecurityConfig::new("test_secret_key_for_testing_purposes_only".as_bytes());
        // 20 minutes ago so a 15-minute token is expired
        let now = SystemTime::now() - Duration::from_secs(20 * 60);
        let token = mint_access_token(7, now, 15 * 60, &security).unwrap();
        assert!(matches!(
            verify_access_token(&token, &security),
            Err(AppError::UnauthorizedInvalidJwt)
        ));
    }

    #[test]
    fn test_bad_signature() {
        let security_a = SecurityConfig::new("secret-A".as_bytes());
        let token = mint_access_token(7, SystemTime::now(), 900, &security_a).unwrap();
        let security_b = SecurityConfig::new("secret-B".as_bytes());
        assert!(matches!(
            verify_access_token(&token, &security_b),
            Err(AppError::UnauthorizedInvalidJwt)
        ));
    }
}
