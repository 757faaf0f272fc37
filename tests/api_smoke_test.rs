mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::TestApp;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn the_order_flow_speaks_the_message_envelope() {
    let app = TestApp::new().await;
    let branch = app.seed_branch().await;
    let product = app.seed_product("Latte").await;
    let variant = app.seed_variant(product.id, "Oat").await;
    app.seed_variant_stock(variant.id, branch, 10).await;

    let router = pos_api::app_router(app.state.clone());

    // Draft an order over HTTP.
    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/orders",
            json!({
                "items": [{"variant_id": variant.id, "quantity": 2, "price": "1000"}],
                "branch_id": branch,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Order created successfully");
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["subtotal"], "2000");
    assert_eq!(body["data"]["status"], "pending");
    assert!(body.get("datas").is_none());

    // Pay and verify over HTTP.
    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/v1/payments",
            json!({"order_id": order_id, "method": "cash"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let payment_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["orderId"].as_str().unwrap(), order_id);
    assert_eq!(body["data"]["status"], "success");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri(format!("/api/v1/payments/{}/verify", payment_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/orders/{}", order_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "completed");

    // Listings use the plural envelope field.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/orders")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["datas"].is_array());
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn validation_failures_map_to_bad_request() {
    let app = TestApp::new().await;
    let router = pos_api::app_router(app.state.clone());

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/api/v1/orders",
            json!({"items": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Bad Request");
    assert!(body["message"].as_str().unwrap().contains("Validation"));
}

#[tokio::test]
async fn unknown_resources_map_to_not_found() {
    let app = TestApp::new().await;
    let router = pos_api::app_router(app.state.clone());

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/orders/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;
    let router = pos_api::app_router(app.state.clone());

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["checks"]["database"], "healthy");
}
