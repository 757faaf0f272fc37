use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::payments::CreatePaymentRequest;
use crate::{AppState, ListQuery, MessageResponse};

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment).get(list_payments))
        .route("/:id", get(get_payment))
        .route("/:id/verify", put(verify_payment))
}

/// Creates a payment against a pending order. The stock effects happen at
/// verification, not here.
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment created"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not pending"),
    ),
    tag = "payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state.services.payments.create_payment(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_data(
            "Payment created successfully",
            payment,
        )),
    ))
}

/// Settles a payment: deducts stock, appends ledger movements and completes
/// the order, atomically.
#[utoipa::path(
    put,
    path = "/api/v1/payments/{id}/verify",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment verified and order completed"),
        (status = 404, description = "Payment, order or stock row not found"),
        (status = 409, description = "Order is not pending"),
        (status = 422, description = "Insufficient stock"),
    ),
    tag = "payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state.services.payments.verify_payment(id).await?;
    Ok(Json(MessageResponse::with_data(
        "Payment verified successfully",
        payment,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments",
    params(ListQuery),
    responses((status = 200, description = "Payments listed")),
    tag = "payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let list = state
        .services
        .payments
        .list_payments(query.page, query.limit)
        .await?;
    Ok(Json(MessageResponse::with_datas(
        "Payments retrieved successfully",
        list.payments,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment retrieved"),
        (status = 404, description = "Payment not found"),
    ),
    tag = "payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state.services.payments.get_payment(id).await?;
    Ok(Json(MessageResponse::with_data(
        "Payment retrieved successfully",
        payment,
    )))
}
