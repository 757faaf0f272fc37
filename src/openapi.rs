use utoipa::OpenApi;

use crate::entities::{MovementType, OrderStatus, PaymentMethod, PaymentStatus};
use crate::errors::ErrorResponse;
use crate::handlers::orders::UpdateQuantityRequest;
use crate::services::branches::{CreateBranchRequest, UpdateBranchRequest};
use crate::services::catalog::{
    CreateCategoryRequest, CreateProductRequest, CreateVariantRequest, ProductView,
    UpdateProductRequest, UpdateVariantRequest, VariantView,
};
use crate::services::customers::{CreateCustomerRequest, UpdateCustomerRequest};
use crate::services::inventory::{
    CreateStockRequest, MovementView, StockView, UpdateStockRequest,
};
use crate::services::orders::{
    CreateOrderRequest, DraftItemInput, OrderItemView, OrderView, UpdateOrderRequest,
};
use crate::services::payments::{CreatePaymentRequest, PaymentView};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pos-api",
        description = "Point-of-sale backend: branches, catalog, stock, orders and payment settlement"
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::update_item_quantity,
        crate::handlers::orders::remove_item,
        crate::handlers::orders::cancel_order,
        crate::handlers::payments::create_payment,
        crate::handlers::payments::verify_payment,
        crate::handlers::payments::list_payments,
        crate::handlers::payments::get_payment,
        crate::handlers::stocks::create_stock,
        crate::handlers::stocks::list_stocks,
        crate::handlers::stocks::get_stock,
        crate::handlers::stocks::update_stock,
        crate::handlers::stocks::delete_stock,
        crate::handlers::stocks::list_movements,
        crate::handlers::products::create_category,
        crate::handlers::products::list_categories,
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::create_variant,
        crate::handlers::products::update_variant,
        crate::handlers::products::delete_variant,
        crate::handlers::branches::create_branch,
        crate::handlers::branches::list_branches,
        crate::handlers::branches::get_branch,
        crate::handlers::branches::update_branch,
        crate::handlers::branches::deactivate_branch,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::delete_customer,
    ),
    components(schemas(
        ErrorResponse,
        OrderStatus,
        PaymentStatus,
        PaymentMethod,
        MovementType,
        CreateOrderRequest,
        DraftItemInput,
        UpdateOrderRequest,
        UpdateQuantityRequest,
        OrderView,
        OrderItemView,
        CreatePaymentRequest,
        PaymentView,
        CreateStockRequest,
        UpdateStockRequest,
        StockView,
        MovementView,
        CreateCategoryRequest,
        CreateProductRequest,
        UpdateProductRequest,
        CreateVariantRequest,
        UpdateVariantRequest,
        ProductView,
        VariantView,
        CreateBranchRequest,
        UpdateBranchRequest,
        CreateCustomerRequest,
        UpdateCustomerRequest,
    )),
    tags(
        (name = "orders", description = "Draft orders and line mutations"),
        (name = "payments", description = "Payments and settlement"),
        (name = "stocks", description = "Stock balances and the movement ledger"),
        (name = "catalog", description = "Categories, products and variants"),
        (name = "branches", description = "Branch management"),
        (name = "customers", description = "Customer records"),
    )
)]
pub struct ApiDoc;
