use axum::http::{header, Method};
use axum::routing::{delete, get, post, put};
use axum::{middleware, response::Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config;
use crate::handlers;
use crate::middleware::jwt_auth_middleware;

pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Bearer-token protected API
        .merge(protected_routes().route_layer(middleware::from_fn(jwt_auth_middleware)))
        // Global middleware
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router {
    Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/token", post(handlers::auth::token))
        .route("/api/products", get(handlers::products::list))
        .route("/api/products/:product_id", get(handlers::products::get))
        .route("/api/categories", get(handlers::categories::list))
        .route("/api/locations", get(handlers::locations::list))
        .route("/api/locations/:location_id", get(handlers::locations::get))
        .route("/api/tradein/estimate", get(handlers::tradein::estimate))
        // Stripe calls this; it authenticates with its signature header.
        .route("/api/orders/stripe-webhook", post(handlers::orders::stripe_webhook))
}

fn protected_routes() -> Router {
    Router::new()
        // Cart
        .route("/api/cart", get(handlers::cart::get))
        .route("/api/cart/count", get(handlers::cart::count))
        .route("/api/cart/items", post(handlers::cart::add_item))
        .route(
            "/api/cart/items/:product_id",
            put(handlers::cart::update_item).delete(handlers::cart::delete_item),
        )
        // Orders
        .route("/api/orders", post(handlers::orders::create))
        .route("/api/orders/checkout", post(handlers::orders::checkout))
        .route("/api/orders/me", get(handlers::orders::my_orders))
        // Trade-in
        .route(
            "/api/tradein/pickup-requests",
            post(handlers::tradein::create_pickup_request),
        )
        .route(
            "/api/tradein/pickup-requests/me",
            get(handlers::tradein::list_my_pickups),
        )
        .route(
            "/api/tradein/pickup-requests/:pickup_id/respond",
            post(handlers::tradein::respond_to_offer),
        )
        // Profile
        .route("/api/users/me/items", get(handlers::users::my_items))
        // Addresses
        .route(
            "/api/addresses",
            get(handlers::addresses::list).post(handlers::addresses::create),
        )
        .route(
            "/api/addresses/:address_id",
            put(handlers::addresses::update).delete(handlers::addresses::delete),
        )
        // Admin (role enforced in the handlers)
        .route("/api/admin/orders", get(handlers::admin::list_orders))
        .route(
            "/api/admin/orders/:order_id",
            put(handlers::admin::update_order).delete(handlers::admin::delete_order),
        )
        .route("/api/admin/tradeins", get(handlers::admin::list_tradeins))
        .route(
            "/api/admin/tradeins/:pickup_id/evaluate",
            put(handlers::admin::evaluate_tradein),
        )
        .route(
            "/api/admin/tradeins/:pickup_id",
            delete(handlers::admin::delete_tradein),
        )
        // Internal (evaluator role)
        .route(
            "/api/internal/evaluations",
            post(handlers::internal::create_evaluation),
        )
}

fn cors_layer() -> CorsLayer {
    let origins = &config::config().security.cors_origins;

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Revo Backend API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    match crate::db::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({ "status": "healthy" })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "database_error": e.to_string(),
            })),
        ),
    }
}
