use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;

/// Bearer token claims. `sub` carries the user id as a string for
/// compatibility with clients that treat it opaquely; `id` is the same
/// value as an integer.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub id: i64,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, email: String, role: String) -> Self {
        let now = Utc::now();
        let expire_minutes = config::config().security.access_token_expire_minutes;
        let exp = (now + Duration::minutes(expire_minutes)).timestamp();

        Self {
            sub: user_id.to_string(),
            email,
            id: user_id,
            role,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

pub fn generate_jwt(claims: Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, &claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, config::config().security.bcrypt_cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_preserves_claims() {
        let claims = Claims::new(42, "user@example.com".to_string(), "customer".to_string());
        let token = generate_jwt(claims).expect("token");

        let decoded = validate_jwt(&token).expect("claims");
        assert_eq!(decoded.id, 42);
        assert_eq!(decoded.sub, "42");
        assert_eq!(decoded.email, "user@example.com");
        assert_eq!(decoded.role, "customer");
        assert!(decoded.exp > decoded.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let claims = Claims::new(1, "a@b.com".to_string(), "customer".to_string());
        let mut token = generate_jwt(claims).expect("token");
        token.push('x');
        assert!(validate_jwt(&token).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("test123").expect("hash");
        assert!(verify_password("test123", &hash).expect("verify"));
        assert!(!verify_password("wrong", &hash).expect("verify"));
    }
}
