use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        BranchService, CatalogService, CustomerService, OrderService, PaymentService,
        StockService,
    },
};
use std::sync::Arc;

pub mod branches;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod stocks;

/// The service set shared by all HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub payments: PaymentService,
    pub stocks: StockService,
    pub catalog: CatalogService,
    pub branches: BranchService,
    pub customers: CustomerService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            orders: OrderService::new(db.clone(), event_sender.clone()),
            payments: PaymentService::new(db.clone(), event_sender.clone()),
            stocks: StockService::new(db.clone(), event_sender.clone()),
            catalog: CatalogService::new(db.clone(), event_sender.clone()),
            branches: BranchService::new(db.clone(), event_sender.clone()),
            customers: CustomerService::new(db, event_sender),
        }
    }
}
