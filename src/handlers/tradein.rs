use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{self, models::PickupRequest};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::pricing;

#[derive(Debug, Deserialize)]
pub struct PickupRequestCreate {
    pub brand_id: Option<i64>,
    pub model_text: Option<String>,
    pub storage: Option<String>,
    pub condition: Option<String>,
    pub additional_info: Option<String>,
    pub photos: Option<Value>,
    pub address_json: Option<Value>,
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondPayload {
    // "accept" or "reject"
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    pub model: String,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub model: String,
    pub condition: String,
    pub estimated_price: Option<f64>,
    pub currency: &'static str,
}

/// GET /api/tradein/estimate - quote a trade-in price from the static table
pub async fn estimate(Query(query): Query<EstimateQuery>) -> Json<EstimateResponse> {
    let condition = query.condition.unwrap_or_else(|| "C".to_string());
    let estimated_price = pricing::estimate_price(&query.model, &condition);

    Json(EstimateResponse {
        model: query.model,
        condition,
        estimated_price,
        currency: "CAD",
    })
}

/// POST /api/tradein/pickup-requests - submit a device for pickup/evaluation
pub async fn create_pickup_request(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<PickupRequestCreate>,
) -> Result<(StatusCode, Json<PickupRequest>), ApiError> {
    let pool = db::pool().await?;

    let estimated_price = match (&payload.model_text, &payload.condition) {
        (Some(model), Some(condition)) => pricing::estimate_price(model, condition),
        (Some(model), None) => pricing::estimate_price(model, "C"),
        _ => None,
    };

    let pr = sqlx::query_as::<_, PickupRequest>(
        "INSERT INTO pickup_requests \
         (user_id, brand_id, model_text, storage, condition, additional_info, \
          photos_json, address_json, scheduled_at, estimated_price, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'requested') \
         RETURNING *",
    )
    .bind(user.id)
    .bind(payload.brand_id)
    .bind(&payload.model_text)
    .bind(&payload.storage)
    .bind(&payload.condition)
    .bind(&payload.additional_info)
    .bind(payload.photos)
    .bind(payload.address_json)
    .bind(&payload.scheduled_at)
    .bind(estimated_price)
    .fetch_one(&pool)
    .await?;

    tracing::info!(pickup_id = pr.id, user_id = user.id, "created pickup request");

    Ok((StatusCode::CREATED, Json(pr)))
}

/// GET /api/tradein/pickup-requests/me - the caller's pickup requests
pub async fn list_my_pickups(
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PickupRequest>>, ApiError> {
    let pool = db::pool().await?;

    let pickups = sqlx::query_as::<_, PickupRequest>(
        "SELECT * FROM pickup_requests WHERE user_id = $1 ORDER BY id DESC",
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(pickups))
}

/// POST /api/tradein/pickup-requests/:id/respond - accept or reject an offer
pub async fn respond_to_offer(
    Extension(user): Extension<AuthUser>,
    Path(pickup_id): Path<i64>,
    Json(payload): Json<RespondPayload>,
) -> Result<Json<PickupRequest>, ApiError> {
    let new_status = match payload.action.trim().to_lowercase().as_str() {
        "accept" => "accepted",
        "reject" => "rejected",
        _ => return Err(ApiError::bad_request("Invalid action")),
    };

    let pool = db::pool().await?;

    // Ownership is part of the predicate: other users' requests look absent.
    let pr = sqlx::query_as::<_, PickupRequest>(
        "UPDATE pickup_requests SET status = $3 \
         WHERE id = $1 AND user_id = $2 \
         RETURNING *",
    )
    .bind(pickup_id)
    .bind(user.id)
    .bind(new_status)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Pickup request not found"))?;

    Ok(Json(pr))
}
