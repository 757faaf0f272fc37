use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per (product-or-variant, branch). Uniqueness is maintained
        // by the inventory service, not by a constraint.
        manager
            .create_table(
                Table::create()
                    .table(ProductStocks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductStocks::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductStocks::ProductId).uuid().null())
                    .col(ColumnDef::new(ProductStocks::VariantId).uuid().null())
                    .col(ColumnDef::new(ProductStocks::BranchId).uuid().null())
                    .col(
                        ColumnDef::new(ProductStocks::Stock)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProductStocks::MinStock)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProductStocks::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductStocks::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProductStocks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ProductStocks {
    Table,
    Id,
    ProductId,
    VariantId,
    BranchId,
    Stock,
    MinStock,
    CreatedAt,
    UpdatedAt,
}
