use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::branches::{CreateBranchRequest, UpdateBranchRequest};
use crate::{AppState, MessageResponse};

pub fn branch_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_branch).get(list_branches))
        .route(
            "/:id",
            get(get_branch).put(update_branch).delete(deactivate_branch),
        )
}

#[utoipa::path(
    post,
    path = "/api/v1/branches",
    request_body = CreateBranchRequest,
    responses(
        (status = 201, description = "Branch created"),
        (status = 409, description = "Branch code already in use"),
    ),
    tag = "branches"
)]
pub async fn create_branch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBranchRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch = state.services.branches.create_branch(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_data(
            "Branch created successfully",
            branch,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/branches",
    responses((status = 200, description = "Branches listed")),
    tag = "branches"
)]
pub async fn list_branches(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let branches = state.services.branches.list_branches().await?;
    Ok(Json(MessageResponse::with_datas(
        "Branches retrieved successfully",
        branches,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/branches/{id}",
    params(("id" = Uuid, Path, description = "Branch id")),
    responses(
        (status = 200, description = "Branch retrieved"),
        (status = 404, description = "Branch not found"),
    ),
    tag = "branches"
)]
pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch = state.services.branches.get_branch(id).await?;
    Ok(Json(MessageResponse::with_data(
        "Branch retrieved successfully",
        branch,
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/branches/{id}",
    params(("id" = Uuid, Path, description = "Branch id")),
    request_body = UpdateBranchRequest,
    responses(
        (status = 200, description = "Branch updated"),
        (status = 404, description = "Branch not found"),
    ),
    tag = "branches"
)]
pub async fn update_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBranchRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch = state.services.branches.update_branch(id, payload).await?;
    Ok(Json(MessageResponse::with_data(
        "Branch updated successfully",
        branch,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/branches/{id}",
    params(("id" = Uuid, Path, description = "Branch id")),
    responses(
        (status = 200, description = "Branch deactivated"),
        (status = 404, description = "Branch not found"),
    ),
    tag = "branches"
)]
pub async fn deactivate_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let branch = state.services.branches.deactivate_branch(id).await?;
    Ok(Json(MessageResponse::with_data(
        "Branch deactivated successfully",
        branch,
    )))
}
