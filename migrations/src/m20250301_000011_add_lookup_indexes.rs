use sea_orm_migration::prelude::*;

use crate::m20250301_000005_create_product_variants_table::ProductVariants;
use crate::m20250301_000006_create_product_stocks_table::ProductStocks;
use crate::m20250301_000007_create_stock_movements_table::StockMovements;
use crate::m20250301_000009_create_order_items_table::OrderItems;
use crate::m20250301_000010_create_payments_table::Payments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_stocks_variant_branch")
                    .table(ProductStocks::Table)
                    .col(ProductStocks::VariantId)
                    .col(ProductStocks::BranchId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_stocks_product_branch")
                    .table(ProductStocks::Table)
                    .col(ProductStocks::ProductId)
                    .col(ProductStocks::BranchId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_reference")
                    .table(StockMovements::Table)
                    .col(StockMovements::ReferenceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_order_id")
                    .table(Payments::Table)
                    .col(Payments::OrderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_product_id")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::ProductId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_order_items_order_id").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_product_stocks_variant_branch")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_product_stocks_product_branch")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_stock_movements_reference")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_payments_order_id").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_product_variants_product_id")
                    .to_owned(),
            )
            .await
    }
}
