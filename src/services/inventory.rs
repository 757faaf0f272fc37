use crate::{
    db::DbPool,
    entities::{
        branch::Entity as BranchEntity,
        product::{self, Entity as ProductEntity},
        product_stock::{self, Entity as ProductStockEntity},
        product_variant::{self, Entity as ProductVariantEntity},
        stock_movement::{self, Entity as StockMovementEntity, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::ItemRef,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateStockRequest {
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub branch_id: Uuid,
    pub stock: i32,
    pub min_stock: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStockRequest {
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockView {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub stock: i32,
    pub min_stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<product_stock::Model> for StockView {
    fn from(model: product_stock::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            variant_id: model.variant_id,
            branch_id: model.branch_id,
            stock: model.stock,
            min_stock: model.min_stock,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovementView {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub branch_id: Uuid,
    pub reference_type: MovementType,
    pub qty: i32,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<stock_movement::Model> for MovementView {
    fn from(model: stock_movement::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            variant_id: model.variant_id,
            branch_id: model.branch_id,
            reference_type: model.reference_type,
            qty: model.qty,
            reference_id: model.reference_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovementListView {
    pub movements: Vec<MovementView>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for stock balances and the movement ledger. Besides settlement,
/// this is the only writer of balance rows; every manual change appends an
/// `adjust` ledger entry alongside it.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl StockService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Opens a balance row for a product or variant at a branch, recording
    /// the opening quantity in the ledger.
    #[instrument(skip(self, request), fields(branch_id = %request.branch_id))]
    pub async fn create_stock(
        &self,
        request: CreateStockRequest,
    ) -> Result<StockView, ServiceError> {
        let db = self.db.as_ref();

        let item = match (request.product_id, request.variant_id) {
            (None, Some(variant_id)) => ItemRef::Variant(variant_id),
            (Some(product_id), None) => ItemRef::Product(product_id),
            (None, None) => {
                return Err(ServiceError::ValidationError(
                    "Product ID or variant ID is required".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ServiceError::ValidationError(
                    "Provide either a product ID or a variant ID, not both".to_string(),
                ));
            }
        };
        if request.stock < 0 {
            return Err(ServiceError::ValidationError(
                "Stock must not be negative".to_string(),
            ));
        }

        BranchEntity::find_by_id(request.branch_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Branch not found".to_string()))?;
        self.ensure_item_exists(item).await?;

        // One balance row per (item, branch); duplicates would break the
        // settlement lookup.
        let mut query = ProductStockEntity::find()
            .filter(product_stock::Column::BranchId.eq(request.branch_id));
        query = match item {
            ItemRef::Variant(variant_id) => {
                query.filter(product_stock::Column::VariantId.eq(variant_id))
            }
            ItemRef::Product(product_id) => query
                .filter(product_stock::Column::ProductId.eq(product_id))
                .filter(product_stock::Column::VariantId.is_null()),
        };
        if query.one(db).await?.is_some() {
            return Err(ServiceError::Conflict(
                "Stock row already exists for this item and branch".to_string(),
            ));
        }

        let branch_id = request.branch_id;
        let stock = request.stock;
        let min_stock = request.min_stock.unwrap_or(0);

        let saved = db
            .transaction::<_, product_stock::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let row = product_stock::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(item.product_id()),
                        variant_id: Set(item.variant_id()),
                        branch_id: Set(Some(branch_id)),
                        stock: Set(stock),
                        min_stock: Set(min_stock),
                        created_at: Set(now),
                        updated_at: Set(Some(now)),
                    }
                    .insert(txn)
                    .await?;

                    if stock != 0 {
                        record_adjust_movement(txn, item, branch_id, stock, row.id).await?;
                    }

                    Ok(row)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(stock_id = %saved.id, item = %item, stock = stock, "Stock row created");
        self.event_sender
            .send_or_log(Event::StockAdjusted {
                stock_id: saved.id,
                delta: stock,
            })
            .await;

        Ok(saved.into())
    }

    /// Updates a balance row. A stock change appends an `adjust` movement
    /// carrying the signed difference.
    #[instrument(skip(self, request), fields(stock_id = %stock_id))]
    pub async fn update_stock(
        &self,
        stock_id: Uuid,
        request: UpdateStockRequest,
    ) -> Result<StockView, ServiceError> {
        let db = self.db.as_ref();

        let row = ProductStockEntity::find_by_id(stock_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product stock not found".to_string()))?;

        if let Some(new_stock) = request.stock {
            if new_stock < 0 {
                return Err(ServiceError::ValidationError(
                    "Stock must not be negative".to_string(),
                ));
            }
        }

        let delta = request
            .stock
            .map(|new_stock| new_stock - row.stock)
            .unwrap_or(0);
        let item = row.item_ref();
        let branch_id = row.branch_id;

        let saved = db
            .transaction::<_, product_stock::Model, ServiceError>(move |txn| {
                let request_stock = request.stock;
                let request_min_stock = request.min_stock;
                Box::pin(async move {
                    let row_id = row.id;
                    let mut active: product_stock::ActiveModel = row.into();
                    if let Some(new_stock) = request_stock {
                        active.stock = Set(new_stock);
                    }
                    if let Some(min_stock) = request_min_stock {
                        active.min_stock = Set(min_stock);
                    }
                    active.updated_at = Set(Some(Utc::now()));
                    let saved = active.update(txn).await?;

                    if delta != 0 {
                        if let (Some(item), Some(branch)) = (item, branch_id) {
                            record_adjust_movement(txn, item, branch, delta, row_id).await?;
                        }
                    }

                    Ok(saved)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        if delta != 0 {
            info!(stock_id = %saved.id, delta = delta, "Stock adjusted");
            self.event_sender
                .send_or_log(Event::StockAdjusted {
                    stock_id: saved.id,
                    delta,
                })
                .await;
        }

        Ok(saved.into())
    }

    /// Retrieves a balance row by id.
    #[instrument(skip(self), fields(stock_id = %stock_id))]
    pub async fn get_stock(&self, stock_id: Uuid) -> Result<StockView, ServiceError> {
        let row = ProductStockEntity::find_by_id(stock_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product stock not found".to_string()))?;

        Ok(row.into())
    }

    /// Lists balance rows, optionally scoped to a branch.
    #[instrument(skip(self))]
    pub async fn list_stocks(
        &self,
        branch_id: Option<Uuid>,
    ) -> Result<Vec<StockView>, ServiceError> {
        let mut query = ProductStockEntity::find()
            .order_by_asc(product_stock::Column::CreatedAt);
        if let Some(branch) = branch_id {
            query = query.filter(product_stock::Column::BranchId.eq(branch));
        }
        let rows = query.all(self.db.as_ref()).await?;

        Ok(rows.into_iter().map(StockView::from).collect())
    }

    /// Reads the ledger, newest first.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<MovementListView, ServiceError> {
        let page = page.max(1);
        let paginator = StockMovementEntity::find()
            .order_by_desc(stock_movement::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page.clamp(1, 100));

        let total = paginator.num_items().await?;
        let movements = paginator.fetch_page(page - 1).await?;

        Ok(MovementListView {
            movements: movements.into_iter().map(MovementView::from).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Removes a balance row. The ledger keeps its history; only the
    /// current balance disappears.
    #[instrument(skip(self), fields(stock_id = %stock_id))]
    pub async fn delete_stock(&self, stock_id: Uuid) -> Result<(), ServiceError> {
        let row = ProductStockEntity::find_by_id(stock_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product stock not found".to_string()))?;

        ProductStockEntity::delete_by_id(row.id)
            .exec(self.db.as_ref())
            .await?;

        info!(stock_id = %stock_id, "Stock row deleted");
        Ok(())
    }

    async fn ensure_item_exists(&self, item: ItemRef) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        match item {
            ItemRef::Variant(variant_id) => {
                ProductVariantEntity::find_by_id(variant_id)
                    .filter(product_variant::Column::DeletedAt.is_null())
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound("Product variant not found".to_string())
                    })?;
            }
            ItemRef::Product(product_id) => {
                ProductEntity::find_by_id(product_id)
                    .filter(product::Column::DeletedAt.is_null())
                    .one(db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
            }
        }
        Ok(())
    }
}

/// Appends one `adjust` ledger entry for a manual balance change.
async fn record_adjust_movement<C: ConnectionTrait>(
    txn: &C,
    item: ItemRef,
    branch_id: Uuid,
    qty: i32,
    stock_row_id: Uuid,
) -> Result<(), ServiceError> {
    stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(item.product_id()),
        variant_id: Set(item.variant_id()),
        branch_id: Set(branch_id),
        reference_type: Set(MovementType::Adjust),
        qty: Set(qty),
        reference_id: Set(Some(stock_row_id)),
        created_at: Set(Utc::now()),
    }
    .insert(txn)
    .await?;

    Ok(())
}
