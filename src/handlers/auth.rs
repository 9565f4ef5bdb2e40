use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::db::{self, models::User};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    // defaults to customer when omitted
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

/// POST /api/auth/register - create an account and return a bearer token
pub async fn register(
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    validate_email(&payload.email)?;
    if payload.password.len() < 6 {
        return Err(ApiError::bad_request("Password must be at least 6 characters"));
    }

    let role = match payload.role.as_deref() {
        None | Some("") => "customer",
        Some(r @ ("customer" | "admin" | "evaluator")) => r,
        Some(other) => {
            return Err(ApiError::bad_request(format!("Unknown role '{}'", other)));
        }
    };

    let pool = db::pool().await?;

    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let password_hash = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(role)
    .fetch_one(&pool)
    .await?;

    let token = issue_token(&user)?;
    tracing::info!(user_id = user.id, "registered new user");

    Ok((StatusCode::CREATED, Json(token)))
}

/// POST /api/auth/token - verify credentials and return a bearer token
pub async fn token(Json(payload): Json<TokenRequest>) -> Result<Json<TokenResponse>, ApiError> {
    let pool = db::pool().await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?;

    let user = match user {
        Some(u) if verify_password(&payload.password, &u.password_hash)? => u,
        _ => return Err(ApiError::unauthorized("Incorrect email or password")),
    };

    Ok(Json(issue_token(&user)?))
}

fn issue_token(user: &User) -> Result<TokenResponse, ApiError> {
    let claims = Claims::new(user.id, user.email.clone(), user.role.clone());
    let token = generate_jwt(claims)
        .map_err(|e| ApiError::internal_server_error(format!("Failed to issue token: {}", e)))?;
    Ok(TokenResponse::bearer(token))
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let parts: Vec<&str> = email.split('@').collect();
    let valid = parts.len() == 2
        && !parts[0].is_empty()
        && parts[1].contains('.')
        && !parts[1].starts_with('.')
        && !parts[1].ends_with('.');

    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid email format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("a.b+c@sub.example.org").is_ok());
        assert!(validate_email("userexample.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@nodot").is_err());
        assert!(validate_email("user@.com").is_err());
    }

    #[test]
    fn token_response_is_bearer() {
        let resp = TokenResponse::bearer("abc".to_string());
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["access_token"], "abc");
        assert_eq!(v["token_type"], "bearer");
    }
}
