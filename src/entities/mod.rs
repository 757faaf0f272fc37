pub mod branch;
pub mod category;
pub mod customer;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod product_stock;
pub mod product_variant;
pub mod stock_movement;

pub use order::OrderStatus;
pub use payment::{PaymentMethod, PaymentStatus};
pub use stock_movement::MovementType;
