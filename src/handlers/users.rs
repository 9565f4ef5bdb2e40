use axum::extract::Query;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{self, models::Order};
use crate::error::ApiError;
use crate::handlers::orders::{order_item_views, OrderItemView};
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderHistoryEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: String,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Serialize)]
pub struct TradeinHistoryEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub brand_name: Option<String>,
    pub model_text: Option<String>,
    pub condition: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub orders: Vec<OrderHistoryEntry>,
    pub pickup_requests: Vec<TradeinHistoryEntry>,
    pub total_orders: usize,
    pub total_tradeins: usize,
    pub all_items: Vec<serde_json::Value>,
}

#[derive(Debug, sqlx::FromRow)]
struct PickupWithBrand {
    id: i64,
    brand_name: Option<String>,
    model_text: Option<String>,
    condition: Option<String>,
    status: Option<String>,
    created_at: DateTime<Utc>,
}

/// GET /api/users/me/items - combined purchase and trade-in history
pub async fn my_items(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let pool = db::pool().await?;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.max(0);

    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
    )
    .bind(user.id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let mut order_entries = Vec::with_capacity(orders.len());
    for order in orders {
        let items = order_item_views(&pool, order.id).await?;
        order_entries.push(OrderHistoryEntry {
            id: order.id,
            kind: "order",
            status: order.status,
            total: order.total,
            created_at: order.created_at,
            items,
        });
    }

    let pickups = sqlx::query_as::<_, PickupWithBrand>(
        "SELECT pr.id, b.name AS brand_name, pr.model_text, pr.condition, pr.status, pr.created_at \
         FROM pickup_requests pr \
         LEFT JOIN brands b ON b.id = pr.brand_id \
         WHERE pr.user_id = $1 \
         ORDER BY pr.id DESC LIMIT $2 OFFSET $3",
    )
    .bind(user.id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let tradein_entries: Vec<TradeinHistoryEntry> = pickups
        .into_iter()
        .map(|p| TradeinHistoryEntry {
            id: p.id,
            kind: "tradein",
            brand_name: p.brand_name,
            model_text: p.model_text,
            condition: p.condition,
            status: p.status,
            created_at: p.created_at,
        })
        .collect();

    // Merge both lists newest-first for the combined activity feed.
    let mut all_items: Vec<(DateTime<Utc>, serde_json::Value)> = Vec::new();
    for entry in &order_entries {
        all_items.push((entry.created_at, serde_json::to_value(entry).unwrap_or_default()));
    }
    for entry in &tradein_entries {
        all_items.push((entry.created_at, serde_json::to_value(entry).unwrap_or_default()));
    }
    all_items.sort_by(|a, b| b.0.cmp(&a.0));
    all_items.truncate(limit as usize);

    Ok(Json(HistoryResponse {
        total_orders: order_entries.len(),
        total_tradeins: tradein_entries.len(),
        all_items: all_items.into_iter().map(|(_, v)| v).collect(),
        orders: order_entries,
        pickup_requests: tradein_entries,
    }))
}
