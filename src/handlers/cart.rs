use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::db::{self, models::Cart};
use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct CartItemCreate {
    pub product_id: i64,
    #[serde(default = "default_qty")]
    pub qty: i32,
}

fn default_qty() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CartItemUpdate {
    pub qty: i32,
}

#[derive(Debug, FromRow)]
struct CartLineRow {
    product_id: i64,
    qty: i32,
    title: String,
    list_price: Option<f64>,
    base_price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product_id: i64,
    pub title: String,
    pub qty: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: i64,
    pub user_id: i64,
    pub items: Vec<CartLineView>,
    pub subtotal: f64,
}

#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: i64,
    pub total_items: i64,
}

/// Fetch the user's cart, creating it on first touch. The upsert keeps
/// concurrent first requests from racing on the unique user_id.
pub async fn get_or_create_cart(pool: &PgPool, user_id: i64) -> Result<Cart, ApiError> {
    let cart = sqlx::query_as::<_, Cart>(
        "INSERT INTO carts (user_id) VALUES ($1) \
         ON CONFLICT (user_id) DO UPDATE SET updated_at = carts.updated_at \
         RETURNING *",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(cart)
}

async fn cart_view(pool: &PgPool, cart: &Cart) -> Result<CartView, ApiError> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        "SELECT ci.product_id, ci.qty, p.title, p.list_price, p.base_price \
         FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 \
         ORDER BY ci.product_id",
    )
    .bind(cart.id)
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut subtotal = 0.0;
    for row in rows {
        let unit_price = row.list_price.or(row.base_price).unwrap_or(0.0);
        let line_total = unit_price * row.qty as f64;
        subtotal += line_total;
        items.push(CartLineView {
            product_id: row.product_id,
            title: row.title,
            qty: row.qty,
            unit_price,
            line_total,
        });
    }

    Ok(CartView {
        id: cart.id,
        user_id: cart.user_id,
        items,
        subtotal,
    })
}

/// GET /api/cart - the caller's cart with line totals and subtotal
pub async fn get(Extension(user): Extension<AuthUser>) -> Result<Json<CartView>, ApiError> {
    let pool = db::pool().await?;
    let cart = get_or_create_cart(&pool, user.id).await?;
    Ok(Json(cart_view(&pool, &cart).await?))
}

/// GET /api/cart/count - distinct line count and summed quantity
pub async fn count(Extension(user): Extension<AuthUser>) -> Result<Json<CartCount>, ApiError> {
    let pool = db::pool().await?;
    let cart = get_or_create_cart(&pool, user.id).await?;

    let (count, total_items) = sqlx::query_as::<_, (i64, Option<i64>)>(
        "SELECT COUNT(*), SUM(qty)::BIGINT FROM cart_items WHERE cart_id = $1",
    )
    .bind(cart.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(CartCount {
        count,
        total_items: total_items.unwrap_or(0),
    }))
}

/// POST /api/cart/items - add a product to the cart, merging quantities
pub async fn add_item(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CartItemCreate>,
) -> Result<(StatusCode, Json<CartView>), ApiError> {
    let pool = db::pool().await?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }

    let cart = get_or_create_cart(&pool, user.id).await?;
    let qty = payload.qty.max(1);

    sqlx::query(
        "INSERT INTO cart_items (cart_id, product_id, qty) VALUES ($1, $2, $3) \
         ON CONFLICT (cart_id, product_id) DO UPDATE SET qty = cart_items.qty + EXCLUDED.qty",
    )
    .bind(cart.id)
    .bind(payload.product_id)
    .bind(qty)
    .execute(&pool)
    .await?;

    touch_cart(&pool, cart.id).await?;

    Ok((StatusCode::CREATED, Json(cart_view(&pool, &cart).await?)))
}

/// PUT /api/cart/items/:product_id - set a line's quantity (<= 0 removes it)
pub async fn update_item(
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<i64>,
    Json(payload): Json<CartItemUpdate>,
) -> Result<Json<CartView>, ApiError> {
    let pool = db::pool().await?;
    let cart = get_or_create_cart(&pool, user.id).await?;

    let result = if payload.qty <= 0 {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart.id)
            .bind(product_id)
            .execute(&pool)
            .await?
    } else {
        sqlx::query("UPDATE cart_items SET qty = $3 WHERE cart_id = $1 AND product_id = $2")
            .bind(cart.id)
            .bind(product_id)
            .bind(payload.qty)
            .execute(&pool)
            .await?
    };

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Item not in cart"));
    }

    touch_cart(&pool, cart.id).await?;

    Ok(Json(cart_view(&pool, &cart).await?))
}

/// DELETE /api/cart/items/:product_id - remove a line
pub async fn delete_item(
    Extension(user): Extension<AuthUser>,
    Path(product_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let pool = db::pool().await?;
    let cart = get_or_create_cart(&pool, user.id).await?;

    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart.id)
        .bind(product_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Item not in cart"));
    }

    touch_cart(&pool, cart.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn touch_cart(pool: &PgPool, cart_id: i64) -> Result<(), ApiError> {
    sqlx::query("UPDATE carts SET updated_at = now() WHERE id = $1")
        .bind(cart_id)
        .execute(pool)
        .await?;
    Ok(())
}
