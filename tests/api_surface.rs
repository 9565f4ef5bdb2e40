//! In-process router tests. These exercise routing, auth middleware, and
//! the handlers that do not touch the database, by driving the router
//! directly with `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use revo_api::auth::{generate_jwt, Claims};
use revo_api::routes::app;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn root_returns_service_banner() {
    let response = app().oneshot(get("/")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["message"], "Revo Backend API");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn locations_are_listed_and_fetchable() {
    let response = app().oneshot(get("/api/locations")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let locations = body.as_array().expect("array");
    assert_eq!(locations.len(), 3);
    assert_eq!(locations[0]["id"], "vancouver");

    let response = app()
        .oneshot(get("/api/locations/ottawa"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], "OTT");
    assert_eq!(body["hub_name"], "Ottawa Lab");
}

#[tokio::test]
async fn unknown_location_is_404() {
    let response = app()
        .oneshot(get("/api/locations/toronto"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn tradein_estimate_quotes_known_models() {
    let response = app()
        .oneshot(get("/api/tradein/estimate?model=iPhone%2015%20Pro&condition=A"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["estimated_price"], 527.0);
    assert_eq!(body["condition"], "A");
    assert_eq!(body["currency"], "CAD");
}

#[tokio::test]
async fn tradein_estimate_defaults_condition_and_handles_unknowns() {
    let response = app()
        .oneshot(get("/api/tradein/estimate?model=Nokia%203310"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["condition"], "C");
    assert_eq!(body["estimated_price"], Value::Null);
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    for uri in [
        "/api/cart",
        "/api/orders/me",
        "/api/tradein/pickup-requests/me",
        "/api/users/me/items",
        "/api/addresses",
        "/api/admin/orders",
    ] {
        let response = app().oneshot(get(uri)).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri: {}", uri);
    }
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let response = app()
        .oneshot(get_with_token("/api/cart", "not.a.jwt"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn customer_token_cannot_reach_admin_routes() {
    let claims = Claims::new(7, "customer@example.com".to_string(), "customer".to_string());
    let token = generate_jwt(claims).expect("token");

    let response = app()
        .oneshot(get_with_token("/api/admin/orders", &token))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["message"], "Admin role required");
}

#[tokio::test]
async fn tradein_evaluation_rejects_unknown_status() {
    let claims = Claims::new(3, "admin@example.com".to_string(), "admin".to_string());
    let token = generate_jwt(claims).expect("token");

    let request = Request::builder()
        .method("PUT")
        .uri("/api/admin/tradeins/1/evaluate")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"final_offer": 150.0, "status": "archived"}"#))
        .expect("request");

    let response = app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["message"], "Unknown status 'archived'");
}

#[tokio::test]
async fn stripe_webhook_without_signature_is_rejected() {
    // The webhook secret is unset in tests, so the handler refuses to
    // process anything rather than skipping verification.
    let request = Request::builder()
        .method("POST")
        .uri("/api/orders/stripe-webhook")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"type":"payment_intent.succeeded"}"#))
        .expect("request");

    let response = app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
