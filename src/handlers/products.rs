use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::catalog::{
    CreateCategoryRequest, CreateProductRequest, CreateVariantRequest, UpdateProductRequest,
    UpdateVariantRequest,
};
use crate::{AppState, MessageResponse};

pub fn category_routes() -> Router<AppState> {
    Router::new().route("/", post(create_category).get(list_categories))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/variants", post(create_variant))
}

pub fn variant_routes() -> Router<AppState> {
    Router::new().route("/:id", put(update_variant).delete(delete_variant))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses((status = 201, description = "Category created")),
    tag = "catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.services.catalog.create_category(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_data(
            "Category created successfully",
            category,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Categories listed")),
    tag = "catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(MessageResponse::with_datas(
        "Categories retrieved successfully",
        categories,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 404, description = "Category not found"),
    ),
    tag = "catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.create_product(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_data(
            "Product created successfully",
            product,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses((status = 200, description = "Products listed with their variants")),
    tag = "catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.catalog.list_products().await?;
    Ok(Json(MessageResponse::with_datas(
        "Products retrieved successfully",
        products,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product retrieved"),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(Json(MessageResponse::with_data(
        "Product retrieved successfully",
        product,
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated"),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.update_product(id, payload).await?;
    Ok(Json(MessageResponse::with_data(
        "Product updated successfully",
        product,
    )))
}

/// Soft-deletes the product and its variants together.
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_product(id).await?;
    Ok(Json(MessageResponse::<()>::message_only(
        "Product deleted successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = CreateVariantRequest,
    responses(
        (status = 201, description = "Variant created"),
        (status = 409, description = "SKU already in use"),
    ),
    tag = "catalog"
)]
pub async fn create_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVariantRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let variant = state.services.catalog.create_variant(id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_data(
            "Product variant created successfully",
            variant,
        )),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/variants/{id}",
    params(("id" = Uuid, Path, description = "Variant id")),
    request_body = UpdateVariantRequest,
    responses(
        (status = 200, description = "Variant updated"),
        (status = 404, description = "Variant not found"),
    ),
    tag = "catalog"
)]
pub async fn update_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVariantRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let variant = state.services.catalog.update_variant(id, payload).await?;
    Ok(Json(MessageResponse::with_data(
        "Product variant updated successfully",
        variant,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/v1/variants/{id}",
    params(("id" = Uuid, Path, description = "Variant id")),
    responses(
        (status = 200, description = "Variant deleted"),
        (status = 404, description = "Variant not found"),
    ),
    tag = "catalog"
)]
pub async fn delete_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_variant(id).await?;
    Ok(Json(MessageResponse::<()>::message_only(
        "Product variant deleted successfully",
    )))
}
