use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use sqlx::PgPool;

use crate::db::{self, models::Address};
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct AddressCreate {
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_country() -> String {
    "Canada".to_string()
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct AddressUpdate {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_default: Option<bool>,
}

/// GET /api/addresses - the caller's addresses, default first then newest
pub async fn list(Extension(user): Extension<AuthUser>) -> Result<Json<Vec<Address>>, ApiError> {
    let pool = db::pool().await?;

    let addresses = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 \
         ORDER BY is_default DESC, created_at DESC",
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(addresses))
}

/// POST /api/addresses - create an address. The first address becomes the
/// default automatically; an explicit default clears the flag elsewhere.
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddressCreate>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    let pool = db::pool().await?;

    let existing =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await?;

    let is_default = payload.is_default || existing == 0;
    if is_default {
        clear_defaults(&pool, user.id, None).await?;
    }

    let address = sqlx::query_as::<_, Address>(
        "INSERT INTO addresses \
         (user_id, full_name, phone_number, address_line1, address_line2, \
          city, state, postal_code, country, is_default) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING *",
    )
    .bind(user.id)
    .bind(&payload.full_name)
    .bind(&payload.phone_number)
    .bind(&payload.address_line1)
    .bind(&payload.address_line2)
    .bind(&payload.city)
    .bind(&payload.state)
    .bind(&payload.postal_code)
    .bind(&payload.country)
    .bind(is_default)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(address)))
}

/// PUT /api/addresses/:id - update an address (owner only)
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(address_id): Path<i64>,
    Json(payload): Json<AddressUpdate>,
) -> Result<Json<Address>, ApiError> {
    let pool = db::pool().await?;

    let address = fetch_owned(&pool, address_id, user.id, "update").await?;

    if payload.is_default == Some(true) {
        clear_defaults(&pool, user.id, Some(address_id)).await?;
    }

    let updated = sqlx::query_as::<_, Address>(
        "UPDATE addresses SET \
           full_name = COALESCE($2, full_name), \
           phone_number = COALESCE($3, phone_number), \
           address_line1 = COALESCE($4, address_line1), \
           address_line2 = COALESCE($5, address_line2), \
           city = COALESCE($6, city), \
           state = COALESCE($7, state), \
           postal_code = COALESCE($8, postal_code), \
           country = COALESCE($9, country), \
           is_default = COALESCE($10, is_default), \
           updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(address.id)
    .bind(&payload.full_name)
    .bind(&payload.phone_number)
    .bind(&payload.address_line1)
    .bind(&payload.address_line2)
    .bind(&payload.city)
    .bind(&payload.state)
    .bind(&payload.postal_code)
    .bind(&payload.country)
    .bind(payload.is_default)
    .fetch_one(&pool)
    .await?;

    Ok(Json(updated))
}

/// DELETE /api/addresses/:id - delete an address (owner only)
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(address_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let pool = db::pool().await?;

    let address = fetch_owned(&pool, address_id, user.id, "delete").await?;

    sqlx::query("DELETE FROM addresses WHERE id = $1")
        .bind(address.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_owned(
    pool: &PgPool,
    address_id: i64,
    user_id: i64,
    verb: &str,
) -> Result<Address, ApiError> {
    let address = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1")
        .bind(address_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Address not found"))?;

    if address.user_id != user_id {
        return Err(ApiError::forbidden(format!(
            "You can only {} your own addresses",
            verb
        )));
    }

    Ok(address)
}

async fn clear_defaults(
    pool: &PgPool,
    user_id: i64,
    except: Option<i64>,
) -> Result<(), ApiError> {
    sqlx::query(
        "UPDATE addresses SET is_default = FALSE \
         WHERE user_id = $1 AND ($2::BIGINT IS NULL OR id <> $2)",
    )
    .bind(user_id)
    .bind(except)
    .execute(pool)
    .await?;
    Ok(())
}
