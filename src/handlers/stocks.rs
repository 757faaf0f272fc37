use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::inventory::{CreateStockRequest, UpdateStockRequest};
use crate::{AppState, ListQuery, MessageResponse};

#[derive(Debug, Deserialize, IntoParams)]
pub struct StockListQuery {
    pub branch_id: Option<Uuid>,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_stock).get(list_stocks))
        .route("/:id", get(get_stock).put(update_stock).delete(delete_stock))
}

pub fn movement_routes() -> Router<AppState> {
    Router::new().route("/", get(list_movements))
}

/// Opens a balance row; the opening quantity lands in the ledger as an
/// `adjust` movement.
#[utoipa::path(
    post,
    path = "/api/v1/stocks",
    request_body = CreateStockRequest,
    responses(
        (status = 201, description = "Stock row created"),
        (status = 404, description = "Branch, product or variant not found"),
        (status = 409, description = "Stock row already exists"),
    ),
    tag = "stocks"
)]
pub async fn create_stock(
    State(state): State<AppState>,
    Json(payload): Json<CreateStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let stock = state.services.stocks.create_stock(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_data(
            "Product stock created successfully",
            stock,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/stocks",
    params(StockListQuery),
    responses((status = 200, description = "Stock rows listed")),
    tag = "stocks"
)]
pub async fn list_stocks(
    State(state): State<AppState>,
    Query(query): Query<StockListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let stocks = state.services.stocks.list_stocks(query.branch_id).await?;
    Ok(Json(MessageResponse::with_datas(
        "Product stocks retrieved successfully",
        stocks,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/stocks/{id}",
    params(("id" = Uuid, Path, description = "Stock row id")),
    responses(
        (status = 200, description = "Stock row retrieved"),
        (status = 404, description = "Stock row not found"),
    ),
    tag = "stocks"
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let stock = state.services.stocks.get_stock(id).await?;
    Ok(Json(MessageResponse::with_data(
        "Product stock retrieved successfully",
        stock,
    )))
}

/// Manual stock adjustment; the signed difference is appended to the
/// ledger.
#[utoipa::path(
    put,
    path = "/api/v1/stocks/{id}",
    params(("id" = Uuid, Path, description = "Stock row id")),
    request_body = UpdateStockRequest,
    responses(
        (status = 200, description = "Stock row updated"),
        (status = 404, description = "Stock row not found"),
    ),
    tag = "stocks"
)]
pub async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStockRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let stock = state.services.stocks.update_stock(id, payload).await?;
    Ok(Json(MessageResponse::with_data(
        "Product stock updated successfully",
        stock,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stocks/{id}",
    params(("id" = Uuid, Path, description = "Stock row id")),
    responses(
        (status = 200, description = "Stock row deleted"),
        (status = 404, description = "Stock row not found"),
    ),
    tag = "stocks"
)]
pub async fn delete_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.stocks.delete_stock(id).await?;
    Ok(Json(MessageResponse::<()>::message_only(
        "Product stock deleted successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-movements",
    params(ListQuery),
    responses((status = 200, description = "Ledger entries listed, newest first")),
    tag = "stocks"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let list = state
        .services
        .stocks
        .list_movements(query.page, query.limit)
        .await?;
    Ok(Json(MessageResponse::with_datas(
        "Stock movements retrieved successfully",
        list.movements,
    )))
}
