//! pos-api library
//!
//! Point-of-sale backend: branches, catalog, stock, draft orders and the
//! payment settlement flow.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Common query parameters for list endpoints.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

/// Response envelope shared by every endpoint: a message plus either one
/// payload (`data`) or a collection (`datas`).
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datas: Option<Vec<T>>,
}

impl<T> MessageResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            datas: None,
        }
    }

    pub fn with_datas(message: impl Into<String>, datas: Vec<T>) -> Self {
        Self {
            message: message.into(),
            data: None,
            datas: Some(datas),
        }
    }

    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            datas: None,
        }
    }
}

/// All `/api/v1` routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/orders", handlers::orders::order_routes())
        .nest("/payments", handlers::payments::payment_routes())
        .nest("/stocks", handlers::stocks::stock_routes())
        .nest("/stock-movements", handlers::stocks::movement_routes())
        .nest("/categories", handlers::products::category_routes())
        .nest("/products", handlers::products::product_routes())
        .nest("/variants", handlers::products::variant_routes())
        .nest("/branches", handlers::branches::branch_routes())
        .nest("/customers", handlers::customers::customer_routes())
}

/// Assembles the full application router, including API docs.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .with_state(state)
}

async fn api_status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pos-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn data_envelope_omits_datas() {
        let response = MessageResponse::with_data("Order retrieved successfully", 7);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["message"], "Order retrieved successfully");
        assert_eq!(value["data"], 7);
        assert!(value.get("datas").is_none());
    }

    #[test]
    fn datas_envelope_omits_data() {
        let response = MessageResponse::with_datas("Orders retrieved successfully", vec![1, 2]);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["datas"], serde_json::json!([1, 2]));
        assert!(value.get("data").is_none());
    }

    #[test]
    fn message_only_envelope_is_bare() {
        let response = MessageResponse::<()>::message_only("Product deleted successfully");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"message": "Product deleted successfully"})
        );
    }
}
