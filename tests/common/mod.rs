#![allow(dead_code)]

use std::sync::Arc;

use pos_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    services::branches::CreateBranchRequest,
    services::catalog::{
        CreateProductRequest, CreateVariantRequest, ProductView, VariantView,
    },
    services::inventory::{CreateStockRequest, StockView},
    services::orders::{CreateOrderRequest, DraftItemInput},
    AppState,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Test harness backed by an in-memory SQLite database with the real
/// migration set applied. The pool is pinned to a single connection so
/// every query sees the same memory database.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:", "127.0.0.1", 18080);
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        Self {
            state,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    pub async fn seed_branch(&self) -> Uuid {
        let branch = self
            .services()
            .branches
            .create_branch(CreateBranchRequest {
                name: "Main".to_string(),
                code: format!("BR-{}", Uuid::new_v4().simple()),
                address: None,
                phone: None,
                email: None,
                city: None,
            })
            .await
            .expect("seed branch");
        branch.id
    }

    pub async fn seed_product(&self, name: &str) -> ProductView {
        self.services()
            .catalog
            .create_product(CreateProductRequest {
                name: name.to_string(),
                price: Some(Decimal::new(1000, 0)),
                description: None,
                category_id: None,
                image_url: None,
            })
            .await
            .expect("seed product")
    }

    pub async fn seed_variant(&self, product_id: Uuid, name: &str) -> VariantView {
        self.services()
            .catalog
            .create_variant(
                product_id,
                CreateVariantRequest {
                    name: name.to_string(),
                    sku: format!("SKU-{}", Uuid::new_v4().simple()),
                    price: Some(Decimal::new(1000, 0)),
                    weight: None,
                    color: None,
                },
            )
            .await
            .expect("seed variant")
    }

    pub async fn seed_variant_stock(&self, variant_id: Uuid, branch_id: Uuid, qty: i32) -> StockView {
        self.services()
            .stocks
            .create_stock(CreateStockRequest {
                product_id: None,
                variant_id: Some(variant_id),
                branch_id,
                stock: qty,
                min_stock: None,
            })
            .await
            .expect("seed variant stock")
    }

    pub async fn seed_product_stock(&self, product_id: Uuid, branch_id: Uuid, qty: i32) -> StockView {
        self.services()
            .stocks
            .create_stock(CreateStockRequest {
                product_id: Some(product_id),
                variant_id: None,
                branch_id,
                stock: qty,
                min_stock: None,
            })
            .await
            .expect("seed product stock")
    }
}

pub fn variant_line(variant_id: Uuid, quantity: i32, price: Decimal) -> DraftItemInput {
    DraftItemInput {
        product_id: None,
        variant_id: Some(variant_id),
        quantity,
        price,
    }
}

pub fn product_line(product_id: Uuid, quantity: i32, price: Decimal) -> DraftItemInput {
    DraftItemInput {
        product_id: Some(product_id),
        variant_id: None,
        quantity,
        price,
    }
}

pub fn draft_request(
    items: Vec<DraftItemInput>,
    branch_id: Option<Uuid>,
    order_id: Option<Uuid>,
) -> CreateOrderRequest {
    CreateOrderRequest {
        items,
        notes: None,
        order_id,
        branch_id,
        user_id: None,
        customer_id: None,
    }
}
