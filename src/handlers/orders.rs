use axum::body::Bytes;
use axum::extract::Query;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};

use crate::config;
use crate::db::{self, models::{Order, OrderItem, Payment}};
use crate::error::ApiError;
use crate::handlers::cart::get_or_create_cart;
use crate::middleware::AuthUser;
use crate::payments::{self, StripeClient, StripeError};

#[derive(Debug, Default, Deserialize)]
pub struct OrderCreate {
    #[serde(rename = "shippingAddress")]
    pub shipping_address: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    pub id: i64,
    pub name: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    // the frontend sends the total as a string, older clients as a number
    pub total: Option<Value>,
    #[serde(rename = "paymentMethod", default)]
    pub payment_method: Option<String>,
    #[serde(rename = "shippingAddress")]
    pub shipping_address: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct OrderCreated {
    pub order_id: i64,
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MyOrdersQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderProductView {
    pub id: i64,
    pub title: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub product_id: i64,
    pub title: String,
    pub unit_price: f64,
    pub qty: i32,
    pub line_total: f64,
    pub product: Option<OrderProductView>,
}

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub status: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct MyOrderView {
    pub id: i64,
    pub user_id: i64,
    pub status: String,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping_fee: f64,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
    pub payment: Option<PaymentView>,
}

#[derive(Debug, FromRow)]
struct CheckoutLine {
    product_id: i64,
    qty: i32,
    title: String,
    list_price: Option<f64>,
    base_price: Option<f64>,
    stock: i32,
}

impl CheckoutLine {
    fn unit_price(&self) -> f64 {
        self.list_price.or(self.base_price).unwrap_or(0.0)
    }

    fn line_total(&self) -> f64 {
        self.unit_price() * self.qty as f64
    }
}

/// POST /api/orders - convert the server-side cart into a pending order,
/// deduct inventory, and open a Stripe PaymentIntent.
pub async fn create(
    Extension(user): Extension<AuthUser>,
    payload: Option<Json<OrderCreate>>,
) -> Result<Json<OrderCreated>, ApiError> {
    let stripe = StripeClient::from_config()?;
    let pool = db::pool().await?;
    let shipping_address = payload.and_then(|Json(p)| p.shipping_address);

    let order = checkout_from_cart(&pool, user.id, shipping_address).await?;

    let amount_cents = (order.total * 100.0).round() as i64;
    let intent = match stripe
        .create_payment_intent(
            amount_cents,
            "usd",
            order.id,
            user.id,
            &format!("Order #{}", order.id),
        )
        .await
    {
        Ok(intent) => intent,
        Err(e) => {
            // Stock was already deducted; undo the order before reporting.
            if let Err(cleanup) = cancel_order_and_restock(&pool, order.id).await {
                tracing::error!(
                    order_id = order.id,
                    "failed to restock after payment intent error: {}",
                    cleanup
                );
            }
            return Err(e.into());
        }
    };

    record_payment(&pool, order.id, &intent.id, order.total, "usd", &intent.status).await?;

    tracing::info!(order_id = order.id, user_id = user.id, "created order");

    Ok(Json(OrderCreated {
        order_id: order.id,
        client_secret: intent.client_secret,
    }))
}

/// Snapshot the user's cart into a pending order and deduct inventory, all
/// in one transaction. An empty cart is a 400 and an oversell a 409; either
/// rolls the whole transaction back.
pub async fn checkout_from_cart(
    pool: &PgPool,
    user_id: i64,
    shipping_address: Option<Value>,
) -> Result<Order, ApiError> {
    let cart = get_or_create_cart(pool, user_id).await?;

    let mut tx = pool.begin().await?;

    // Lock the product rows so concurrent checkouts cannot oversell.
    let lines = sqlx::query_as::<_, CheckoutLine>(
        "SELECT ci.product_id, ci.qty, p.title, p.list_price, p.base_price, p.qty AS stock \
         FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id \
         WHERE ci.cart_id = $1 \
         ORDER BY ci.product_id \
         FOR UPDATE OF p",
    )
    .bind(cart.id)
    .fetch_all(&mut *tx)
    .await?;

    if lines.is_empty() {
        return Err(ApiError::bad_request("Cart is empty"));
    }

    for line in &lines {
        if line.stock < line.qty {
            return Err(ApiError::conflict(format!(
                "Insufficient stock for '{}'",
                line.title
            )));
        }
    }

    let subtotal: f64 = lines.iter().map(|l| l.line_total()).sum();
    let tax = 0.0;
    let shipping_fee = 0.0;
    let total = subtotal + tax + shipping_fee;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (user_id, status, subtotal, tax, shipping_fee, total, shipping_address_json) \
         VALUES ($1, 'pending', $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(user_id)
    .bind(subtotal)
    .bind(tax)
    .bind(shipping_fee)
    .bind(total)
    .bind(shipping_address)
    .fetch_one(&mut *tx)
    .await?;

    for line in &lines {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, title_snapshot, unit_price, qty, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.title)
        .bind(line.unit_price())
        .bind(line.qty)
        .bind(line.line_total())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET qty = qty - $2, updated_at = now() WHERE id = $1")
            .bind(line.product_id)
            .bind(line.qty)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(order)
}

/// Compensation for a failed payment-intent call: put the deducted stock
/// back and drop the order with its lines.
pub async fn cancel_order_and_restock(pool: &PgPool, order_id: i64) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE products p SET qty = p.qty + oi.qty, updated_at = now() \
         FROM order_items oi \
         WHERE oi.order_id = $1 AND oi.product_id = p.id",
    )
    .bind(order_id)
    .execute(&mut *tx)
    .await?;

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
    Ok(())
}

/// POST /api/orders/checkout - frontend-shaped checkout. Card payments go
/// through Stripe; wallet/COD orders are marked paid directly. Errors are
/// reported in-band as `{ success: false, error }` for client compatibility.
pub async fn checkout(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<Value>, ApiError> {
    if payload.items.is_empty() {
        return Ok(Json(json!({ "success": false, "error": "Cart is empty" })));
    }

    let payment_method = payload
        .payment_method
        .as_deref()
        .unwrap_or("card")
        .to_string();
    let needs_stripe = matches!(payment_method.as_str(), "card" | "credit");

    let stripe = if needs_stripe {
        match StripeClient::from_config() {
            Ok(c) => Some(c),
            Err(StripeError::MissingConfig(_)) => {
                return Ok(Json(json!({
                    "success": false,
                    "error": "Stripe secret key is not configured"
                })));
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        None
    };

    let pool = db::pool().await?;

    let subtotal: f64 = payload
        .items
        .iter()
        .map(|item| item.price * item.quantity as f64)
        .sum();
    let total = parse_total(payload.total.as_ref()).unwrap_or(subtotal);

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (user_id, status, subtotal, tax, shipping_fee, total, shipping_address_json) \
         VALUES ($1, 'pending', $2, 0, 0, $3, $4) RETURNING *",
    )
    .bind(user.id)
    .bind(subtotal)
    .bind(total)
    .bind(payload.shipping_address)
    .fetch_one(&pool)
    .await?;

    for item in &payload.items {
        // Unknown product ids are skipped; the snapshot keeps the client name.
        let product_title = sqlx::query_scalar::<_, String>(
            "SELECT title FROM products WHERE id = $1",
        )
        .bind(item.id)
        .fetch_optional(&pool)
        .await?;

        let Some(title) = product_title else { continue };

        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, title_snapshot, unit_price, qty, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (order_id, product_id) DO UPDATE SET \
               qty = order_items.qty + EXCLUDED.qty, \
               line_total = order_items.line_total + EXCLUDED.line_total",
        )
        .bind(order.id)
        .bind(item.id)
        .bind(item.name.clone().unwrap_or(title))
        .bind(item.price)
        .bind(item.quantity)
        .bind(item.price * item.quantity as f64)
        .execute(&pool)
        .await?;
    }

    if let Some(stripe) = stripe {
        let amount_cents = (total * 100.0).round() as i64;
        let intent = match stripe
            .create_payment_intent(
                amount_cents,
                "usd",
                order.id,
                user.id,
                &format!("Order #{}", order.id),
            )
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                tracing::error!(order_id = order.id, "payment intent creation failed: {}", e);
                return Ok(Json(json!({
                    "success": false,
                    "error": format!("Payment processing failed: {}", e)
                })));
            }
        };

        record_payment(&pool, order.id, &intent.id, total, "usd", &intent.status).await?;

        Ok(Json(json!({
            "success": true,
            "orderId": format!("ORD{}", order.id),
            "order_id": order.id,
            "client_secret": intent.client_secret,
        })))
    } else {
        // Wallet or cash-on-delivery settles out of band.
        sqlx::query("UPDATE orders SET status = 'paid' WHERE id = $1")
            .bind(order.id)
            .execute(&pool)
            .await?;

        Ok(Json(json!({
            "success": true,
            "orderId": format!("ORD{}", order.id),
            "order_id": order.id,
        })))
    }
}

/// POST /api/orders/stripe-webhook - reconcile payment outcomes. Signature
/// is verified against the raw body before anything is trusted.
pub async fn stripe_webhook(headers: HeaderMap, body: Bytes) -> Result<Json<Value>, ApiError> {
    let secret = &config::config().stripe.webhook_secret;
    if secret.is_empty() {
        return Err(ApiError::internal_server_error(
            "Stripe webhook secret is not configured",
        ));
    }

    let sig_header = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing Stripe-Signature header"))?;

    payments::verify_webhook_signature(&body, sig_header, secret, Utc::now().timestamp())?;

    let event: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Webhook error: {}", e)))?;

    if event["type"] == "payment_intent.succeeded" {
        let object = &event["data"]["object"];
        let order_id = object["metadata"]["order_id"]
            .as_str()
            .and_then(|s| s.parse::<i64>().ok());

        if let Some(order_id) = order_id {
            let pool = db::pool().await?;
            apply_payment_success(&pool, order_id, object).await?;
        }
    }

    Ok(Json(json!({ "received": true })))
}

async fn apply_payment_success(
    pool: &PgPool,
    order_id: i64,
    intent: &Value,
) -> Result<(), ApiError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await?;

    // Unknown orders and replayed events are ignored.
    let Some(order) = order else { return Ok(()) };
    if order.status == "paid" {
        return Ok(());
    }

    let intent_id = intent["id"].as_str().unwrap_or_default();
    let amount_minor = intent["amount_received"]
        .as_i64()
        .or_else(|| intent["amount"].as_i64())
        .unwrap_or(0);
    let amount = amount_minor as f64 / 100.0;
    let currency = intent["currency"].as_str().unwrap_or("usd");

    sqlx::query("UPDATE orders SET status = 'paid' WHERE id = $1")
        .bind(order.id)
        .execute(pool)
        .await?;

    let updated = sqlx::query(
        "UPDATE payments SET status = 'succeeded', amount = $3, currency = $4 \
         WHERE order_id = $1 AND stripe_pi = $2",
    )
    .bind(order.id)
    .bind(intent_id)
    .bind(amount)
    .bind(currency)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        record_payment(pool, order.id, intent_id, amount, currency, "succeeded").await?;
    }

    tracing::info!(order_id = order.id, "order marked paid via webhook");
    Ok(())
}

/// GET /api/orders/me - the caller's orders, newest first
pub async fn my_orders(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<MyOrdersQuery>,
) -> Result<Json<Vec<MyOrderView>>, ApiError> {
    let pool = db::pool().await?;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.max(0);

    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders \
         WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $3 OFFSET $4",
    )
    .bind(user.id)
    .bind(query.status.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let mut views = Vec::with_capacity(orders.len());
    for order in orders {
        views.push(order_view(&pool, order).await?);
    }

    Ok(Json(views))
}

async fn order_view(pool: &PgPool, order: Order) -> Result<MyOrderView, ApiError> {
    let items = order_item_views(pool, order.id).await?;

    let payment = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE order_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(order.id)
    .fetch_optional(pool)
    .await?
    .map(|p| PaymentView {
        status: p.status,
        amount: p.amount,
        currency: p.currency,
    });

    Ok(MyOrderView {
        id: order.id,
        user_id: order.user_id,
        status: order.status,
        subtotal: order.subtotal,
        tax: order.tax,
        shipping_fee: order.shipping_fee,
        total: order.total,
        created_at: order.created_at,
        items,
        payment,
    })
}

pub(crate) async fn order_item_views(
    pool: &PgPool,
    order_id: i64,
) -> Result<Vec<OrderItemView>, ApiError> {
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY product_id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    let mut views = Vec::with_capacity(items.len());
    for item in items {
        let product = sqlx::query_as::<_, crate::db::models::Product>(
            "SELECT * FROM products WHERE id = $1",
        )
        .bind(item.product_id)
        .fetch_optional(pool)
        .await?;

        views.push(OrderItemView {
            product_id: item.product_id,
            title: item.title_snapshot,
            unit_price: item.unit_price,
            qty: item.qty,
            line_total: item.line_total,
            product: product.map(|p| OrderProductView {
                id: p.id,
                title: p.title.clone(),
                image: p.first_image(),
            }),
        });
    }

    Ok(views)
}

fn parse_total(total: Option<&Value>) -> Option<f64> {
    match total {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

async fn record_payment(
    pool: &PgPool,
    order_id: i64,
    stripe_pi: &str,
    amount: f64,
    currency: &str,
    status: &str,
) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO payments (order_id, stripe_pi, amount, currency, status) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(order_id)
    .bind(stripe_pi)
    .bind(amount)
    .bind(currency)
    .bind(status)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn total_parses_strings_and_numbers() {
        assert_eq!(parse_total(Some(&json!("1234.56"))), Some(1234.56));
        assert_eq!(parse_total(Some(&json!(99))), Some(99.0));
        assert_eq!(parse_total(Some(&json!(" 10.5 "))), Some(10.5));
        assert_eq!(parse_total(Some(&json!("not-a-number"))), None);
        assert_eq!(parse_total(Some(&json!(null))), None);
        assert_eq!(parse_total(None), None);
    }

    #[test]
    fn checkout_request_accepts_frontend_shape() {
        let payload: CheckoutRequest = serde_json::from_value(json!({
            "items": [
                { "id": 1001, "name": "iPhone 14 128GB Midnight", "price": 899.0, "quantity": 2 }
            ],
            "total": "1798.00",
            "paymentMethod": "card",
            "shippingAddress": { "fullName": "John Doe", "city": "Vancouver" }
        }))
        .unwrap();

        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].quantity, 2);
        assert_eq!(payload.payment_method.as_deref(), Some("card"));
        assert!(payload.shipping_address.is_some());
    }

    #[test]
    fn checkout_items_default_quantity() {
        let item: CheckoutItem = serde_json::from_value(json!({ "id": 5, "price": 10.0 })).unwrap();
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn checkout_line_arithmetic() {
        let line = CheckoutLine {
            product_id: 1,
            qty: 3,
            title: "x".into(),
            list_price: Some(100.0),
            base_price: Some(120.0),
            stock: 10,
        };
        assert_eq!(line.unit_price(), 100.0);
        assert_eq!(line.line_total(), 300.0);
    }
}
