use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};

use crate::db::{self, models::{Evaluation, Order, PickupRequest}};
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct OrderUpdatePayload {
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TradeinEvaluationPayload {
    pub final_offer: f64,
    pub notes: Option<String>,
    pub status: String,
    pub evaluation_cost: Option<f64>,
    pub diagnostics: Option<Value>,
    pub parts_replaced: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CustomerSummary {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminOrderRow {
    pub order: Order,
    pub user: CustomerSummary,
}

#[derive(Debug, Serialize)]
pub struct AdminTradeinRow {
    pub pickup: PickupRequest,
    pub user: CustomerSummary,
    pub evaluation: Option<Evaluation>,
}

#[derive(Debug, FromRow)]
struct OrderWithUserRow {
    // order
    id: i64,
    user_id: i64,
    status: String,
    subtotal: f64,
    tax: f64,
    shipping_fee: f64,
    total: f64,
    notes: Option<String>,
    shipping_address_json: Option<Value>,
    created_at: DateTime<Utc>,
    // customer
    email: String,
    full_name: Option<String>,
}

/// GET /api/admin/orders - all orders with customer basics
pub async fn list_orders(
    Extension(admin): Extension<AuthUser>,
) -> Result<Json<Vec<AdminOrderRow>>, ApiError> {
    admin.require_admin()?;
    let pool = db::pool().await?;

    let rows = sqlx::query_as::<_, OrderWithUserRow>(
        "SELECT o.id, o.user_id, o.status, o.subtotal, o.tax, o.shipping_fee, o.total, \
                o.notes, o.shipping_address_json, o.created_at, \
                u.email, u.full_name \
         FROM orders o \
         JOIN users u ON u.id = o.user_id \
         ORDER BY o.created_at DESC, o.id DESC",
    )
    .fetch_all(&pool)
    .await?;

    let results = rows
        .into_iter()
        .map(|r| AdminOrderRow {
            user: CustomerSummary {
                id: r.user_id,
                email: r.email,
                full_name: r.full_name,
            },
            order: Order {
                id: r.id,
                user_id: r.user_id,
                status: r.status,
                subtotal: r.subtotal,
                tax: r.tax,
                shipping_fee: r.shipping_fee,
                total: r.total,
                notes: r.notes,
                shipping_address_json: r.shipping_address_json,
                created_at: r.created_at,
            },
        })
        .collect();

    Ok(Json(results))
}

/// PUT /api/admin/orders/:id - update order status and notes
pub async fn update_order(
    Extension(admin): Extension<AuthUser>,
    Path(order_id): Path<i64>,
    Json(payload): Json<OrderUpdatePayload>,
) -> Result<Json<Order>, ApiError> {
    admin.require_admin()?;

    if let Some(status) = payload.status.as_deref() {
        const VALID: &[&str] = &["pending", "paid", "shipped", "completed", "refunded"];
        if !VALID.contains(&status) {
            return Err(ApiError::bad_request(format!("Unknown status '{}'", status)));
        }
    }

    let pool = db::pool().await?;

    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET \
           status = COALESCE($2, status), \
           notes = COALESCE($3, notes) \
         WHERE id = $1 RETURNING *",
    )
    .bind(order_id)
    .bind(&payload.status)
    .bind(&payload.notes)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Order not found"))?;

    audit(&pool, admin.id, "update", "order", order.id, json!({
        "status": payload.status,
        "notes": payload.notes,
    }))
    .await;

    Ok(Json(order))
}

/// DELETE /api/admin/orders/:id - delete an order with its items and payments
pub async fn delete_order(
    Extension(admin): Extension<AuthUser>,
    Path(order_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    admin.require_admin()?;
    let pool = db::pool().await?;

    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("Order not found"));
    }

    // Dependents go first to satisfy the foreign keys.
    sqlx::query("DELETE FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM payments WHERE order_id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    audit(&pool, admin.id, "delete", "order", order_id, Value::Null).await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/tradeins - pickup requests with evaluations and users
pub async fn list_tradeins(
    Extension(admin): Extension<AuthUser>,
) -> Result<Json<Vec<AdminTradeinRow>>, ApiError> {
    admin.require_admin()?;
    let pool = db::pool().await?;

    let pickups = sqlx::query_as::<_, PickupRequest>(
        "SELECT * FROM pickup_requests ORDER BY id DESC",
    )
    .fetch_all(&pool)
    .await?;

    let mut results = Vec::with_capacity(pickups.len());
    for pickup in pickups {
        let user = sqlx::query_as::<_, (i64, String, Option<String>)>(
            "SELECT id, email, full_name FROM users WHERE id = $1",
        )
        .bind(pickup.user_id)
        .fetch_one(&pool)
        .await?;

        let evaluation = sqlx::query_as::<_, Evaluation>(
            "SELECT * FROM evaluations WHERE pickup_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(pickup.id)
        .fetch_optional(&pool)
        .await?;

        results.push(AdminTradeinRow {
            pickup,
            user: CustomerSummary {
                id: user.0,
                email: user.1,
                full_name: user.2,
            },
            evaluation,
        });
    }

    Ok(Json(results))
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub pickup: PickupRequest,
    pub evaluation: Evaluation,
}

/// PUT /api/admin/tradeins/:id/evaluate - create or update the evaluation
/// and move the pickup to the given status
pub async fn evaluate_tradein(
    Extension(admin): Extension<AuthUser>,
    Path(pickup_id): Path<i64>,
    Json(payload): Json<TradeinEvaluationPayload>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    admin.require_admin()?;

    const VALID: &[&str] = &[
        "requested",
        "collected",
        "evaluating",
        "offered",
        "accepted",
        "rejected",
    ];
    if !VALID.contains(&payload.status.as_str()) {
        return Err(ApiError::bad_request(format!(
            "Unknown status '{}'",
            payload.status
        )));
    }

    let pool = db::pool().await?;

    let pickup = sqlx::query_as::<_, PickupRequest>(
        "SELECT * FROM pickup_requests WHERE id = $1",
    )
    .bind(pickup_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Pickup request not found"))?;

    let existing = sqlx::query_as::<_, Evaluation>(
        "SELECT * FROM evaluations WHERE pickup_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(pickup_id)
    .fetch_optional(&pool)
    .await?;

    let evaluation = if let Some(existing) = existing {
        sqlx::query_as::<_, Evaluation>(
            "UPDATE evaluations SET \
               tester_id = $2, final_offer = $3, notes = $4, \
               evaluation_cost = $5, diagnostics_json = $6, parts_replaced_json = $7 \
             WHERE id = $1 RETURNING *",
        )
        .bind(existing.id)
        .bind(admin.id)
        .bind(payload.final_offer)
        .bind(&payload.notes)
        .bind(payload.evaluation_cost)
        .bind(&payload.diagnostics)
        .bind(&payload.parts_replaced)
        .fetch_one(&pool)
        .await?
    } else {
        sqlx::query_as::<_, Evaluation>(
            "INSERT INTO evaluations \
             (pickup_id, tester_id, final_offer, notes, evaluation_cost, \
              diagnostics_json, parts_replaced_json) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(pickup_id)
        .bind(admin.id)
        .bind(payload.final_offer)
        .bind(&payload.notes)
        .bind(payload.evaluation_cost)
        .bind(&payload.diagnostics)
        .bind(&payload.parts_replaced)
        .fetch_one(&pool)
        .await?
    };

    let pickup = sqlx::query_as::<_, PickupRequest>(
        "UPDATE pickup_requests SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(pickup.id)
    .bind(&payload.status)
    .fetch_one(&pool)
    .await?;

    audit(&pool, admin.id, "evaluate", "pickup_request", pickup.id, json!({
        "final_offer": payload.final_offer,
        "status": payload.status,
    }))
    .await;

    Ok(Json(EvaluateResponse { pickup, evaluation }))
}

/// DELETE /api/admin/tradeins/:id - delete a pickup request and its evaluations
pub async fn delete_tradein(
    Extension(admin): Extension<AuthUser>,
    Path(pickup_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    admin.require_admin()?;
    let pool = db::pool().await?;

    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM pickup_requests WHERE id = $1")
        .bind(pickup_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("Pickup request not found"));
    }

    sqlx::query("DELETE FROM evaluations WHERE pickup_id = $1")
        .bind(pickup_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM pickup_requests WHERE id = $1")
        .bind(pickup_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    audit(&pool, admin.id, "delete", "pickup_request", pickup_id, Value::Null).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Best-effort audit trail for admin mutations. Failures are logged and
/// never surface to the caller.
async fn audit(
    pool: &PgPool,
    user_id: i64,
    action: &str,
    entity: &str,
    entity_id: i64,
    payload: Value,
) {
    let result = sqlx::query(
        "INSERT INTO audit_logs (user_id, action, entity, entity_id, payload_json) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(entity)
    .bind(entity_id)
    .bind(&payload)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("failed to write audit log for {} {}: {}", action, entity, e);
    }
}
