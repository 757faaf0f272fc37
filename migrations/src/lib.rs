pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_branches_table;
mod m20250301_000002_create_customers_table;
mod m20250301_000003_create_categories_table;
mod m20250301_000004_create_products_table;
mod m20250301_000005_create_product_variants_table;
mod m20250301_000006_create_product_stocks_table;
mod m20250301_000007_create_stock_movements_table;
mod m20250301_000008_create_orders_table;
mod m20250301_000009_create_order_items_table;
mod m20250301_000010_create_payments_table;
mod m20250301_000011_add_lookup_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_branches_table::Migration),
            Box::new(m20250301_000002_create_customers_table::Migration),
            Box::new(m20250301_000003_create_categories_table::Migration),
            Box::new(m20250301_000004_create_products_table::Migration),
            Box::new(m20250301_000005_create_product_variants_table::Migration),
            Box::new(m20250301_000006_create_product_stocks_table::Migration),
            Box::new(m20250301_000007_create_stock_movements_table::Migration),
            Box::new(m20250301_000008_create_orders_table::Migration),
            Box::new(m20250301_000009_create_order_items_table::Migration),
            Box::new(m20250301_000010_create_payments_table::Migration),
            Box::new(m20250301_000011_add_lookup_indexes::Migration),
        ]
    }
}
