use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::services::orders::{CreateOrderRequest, UpdateOrderRequest};
use crate::{AppState, ListQuery, MessageResponse};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order).put(update_order).delete(cancel_order))
        .route("/:id/items/:item_id/quantity", put(update_item_quantity))
        .route("/:id/items/:item_id", delete(remove_item))
}

/// Creates a draft order or merges lines into an existing pending one.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order draft saved"),
        (status = 400, description = "Validation failure"),
        (status = 422, description = "Insufficient stock"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.create_or_update(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_data(
            "Order created successfully",
            order,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(ListQuery),
    responses((status = 200, description = "Orders listed")),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let list = state
        .services
        .orders
        .list_orders(query.page, query.limit)
        .await?;
    Ok(Json(MessageResponse::with_datas(
        "Orders retrieved successfully",
        list.orders,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(MessageResponse::with_data(
        "Order retrieved successfully",
        order,
    )))
}

/// Reassigns the order's customer.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated"),
        (status = 404, description = "Order or customer not found"),
    ),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.update_order(id, payload).await?;
    Ok(Json(MessageResponse::with_data(
        "Order updated successfully",
        order,
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/items/{item_id}/quantity",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id"),
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity updated"),
        (status = 409, description = "Order is not editable"),
    ),
    tag = "orders"
)]
pub async fn update_item_quantity(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .update_item_quantity(id, item_id, payload.quantity)
        .await?;
    Ok(Json(MessageResponse::with_data(
        "Order updated successfully",
        order,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order id"),
        ("item_id" = Uuid, Path, description = "Order item id"),
    ),
    responses(
        (status = 200, description = "Item removed"),
        (status = 409, description = "Order is not editable"),
    ),
    tag = "orders"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.remove_item(id, item_id).await?;
    Ok(Json(MessageResponse::with_data(
        "Order item deleted successfully",
        order,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled"),
        (status = 409, description = "Order already closed"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.cancel_order(id).await?;
    Ok(Json(MessageResponse::with_data(
        "Order cancelled successfully",
        order,
    )))
}
