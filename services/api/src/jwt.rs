//! JWT service for token generation and validation
//!
//! Tokens are signed with HS256 and bound to a principal id. They carry
//! issuance and expiry timestamps only; roles are looked up from the store
//! on every request so a role change takes effect immediately.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret used to sign and verify tokens
    pub secret: String,
    /// Token expiration time in seconds (default: 30 days)
    pub expires_in: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: signing secret (required)
    /// - `JWT_EXPIRES_IN`: token expiry in seconds (default: 2592000)
    pub fn from_env() -> ApiResult<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let expires_in = std::env::var("JWT_EXPIRES_IN")
            .unwrap_or_else(|_| "2592000".to_string()) // 30 days
            .parse()
            .unwrap_or(2_592_000);

        Ok(JwtConfig { secret, expires_in })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Sign a token for a principal
    pub fn sign(&self, user_id: Uuid) -> ApiResult<String> {
        let now = now_secs()?;
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + self.config.expires_in,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(e.into()))?;
        Ok(token)
    }

    /// Verify a token and return its claims. Expiry failures map to a
    /// distinct taxonomy kind from malformed or mis-signed tokens.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => ApiError::ExpiredToken,
                    _ => ApiError::InvalidToken,
                }
            })?;
        Ok(data.claims)
    }

    /// Token lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        self.config.expires_in
    }
}

/// Seconds since the unix epoch
pub fn now_secs() -> ApiResult<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs();
    Ok(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtService {
        JwtService::new(JwtConfig {
            secret: secret.to_string(),
            expires_in: 900,
        })
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let jwt = service("test-secret");
        let user_id = Uuid::new_v4();

        let token = jwt.sign(user_id).unwrap();
        let claims = jwt.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp, claims.iat + 900);
    }

    #[test]
    fn expired_token_maps_to_expired_kind() {
        let jwt = service("test-secret");
        let now = now_secs().unwrap();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: now - 1000,
            exp: now - 500,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = jwt.verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::ExpiredToken));
    }

    #[test]
    fn mis_signed_token_maps_to_invalid_kind() {
        let jwt = service("test-secret");
        let other = service("other-secret");
        let token = other.sign(Uuid::new_v4()).unwrap();

        let err = jwt.verify(&token).unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[test]
    fn garbage_token_maps_to_invalid_kind() {
        let jwt = service("test-secret");
        let err = jwt.verify("not-a-token").unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }
}
