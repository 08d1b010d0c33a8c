//! Bearer tokens issued at login

use chrono::Utc;
use database_layer::User;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

// =============================================================================
// JWT TOKEN CLAIMS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// Issued at timestamp (seconds since epoch)
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch)
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(user_id: i32, email: impl Into<String>, ttl_seconds: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email: email.into(),
            iat: now,
            exp: now + ttl_seconds,
        }
    }

    pub fn user_id(&self) -> Result<i32, TokenError> {
        self.sub
            .parse()
            .map_err(|_| TokenError::Invalid("subject is not a user id".to_string()))
    }
}

// =============================================================================
// TOKEN SERVICE
// =============================================================================

/// HS256 signer and validator over the configured secret
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let claims = TokenClaims::new(user.id, user.email.clone(), self.ttl_seconds);
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn user() -> User {
        User {
            id: 7,
            email: "dokter@klinik.id".to_string(),
            password_hash: String::new(),
            name: "Dr. Sari".to_string(),
            role: "DOCTOR".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_validates() {
        let service = TokenService::new(SECRET, 3600);
        let token = service.issue(&user()).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.user_id(), Ok(7));
        assert_eq!(claims.email, "dokter@klinik.id");
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = TokenService::new(SECRET, 3600);
        let mut claims = TokenClaims::new(7, "dokter@klinik.id", 3600);
        claims.exp = Utc::now().timestamp() - 10;
        let token = service.sign(&claims).unwrap();

        assert_eq!(service.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = TokenService::new("ffffffffffffffffffffffffffffffff", 3600);
        let token = other.issue(&user()).unwrap();

        let result = TokenService::new(SECRET, 3600).validate(&token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }
}
