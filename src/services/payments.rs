use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item::{self, Entity as OrderItemEntity},
        payment::{self, Entity as PaymentEntity, PaymentMethod, PaymentStatus},
        product_stock::{self, Entity as ProductStockEntity},
        product_variant::{self, Entity as ProductVariantEntity},
        stock_movement::{self, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::ItemRef,
};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref PAYMENT_SETTLEMENTS: IntCounter = IntCounter::new(
        "pos_payment_settlements_total",
        "Total number of settled payments"
    )
    .expect("metric can be created");
    static ref PAYMENT_SETTLEMENT_FAILURES: IntCounter = IntCounter::new(
        "pos_payment_settlement_failures_total",
        "Total number of failed settlement attempts"
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentView {
    pub id: Uuid,
    #[serde(rename = "orderId")]
    pub order_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    #[serde(rename = "paymentMethod")]
    pub payment_method: PaymentMethod,
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<payment::Model> for PaymentView {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            amount: model.amount,
            status: model.status,
            payment_method: model.method,
            paid_at: model.paid_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentListView {
    pub payments: Vec<PaymentView>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// A stock deduction performed during settlement, reported out of the
/// transaction for event publication.
#[derive(Debug, Clone)]
struct Deduction {
    stock_id: Uuid,
    qty: i32,
}

/// Service for payments and settlement. Verification is the only writer
/// that touches stock, ledger and order state together.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a payment against a pending order, snapshotting the order
    /// total as the amount.
    ///
    /// The row is recorded as successful with `paid_at` set immediately;
    /// stock is only touched by [`Self::verify_payment`]. A crash between
    /// the two steps therefore leaves a successful payment with no stock
    /// deducted and a still-pending order.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<PaymentView, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = self.db.as_ref();

        let order = OrderEntity::find_by_id(request.order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::Conflict(
                "Order status is not pending".to_string(),
            ));
        }

        let now = Utc::now();
        let payment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            status: Set(PaymentStatus::Success),
            method: Set(request.method),
            reference_number: Set(None),
            amount: Set(order.total_amount()),
            paid_at: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(db)
        .await?;

        info!(payment_id = %payment.id, order_id = %order.id, amount = %payment.amount, "Payment created");
        self.event_sender
            .send_or_log(Event::PaymentCreated(payment.id))
            .await;

        Ok(payment.into())
    }

    /// Settles a payment: re-validates the order is pending, deducts every
    /// line's stock, appends sale movements to the ledger and completes the
    /// order — all inside one transaction. Any failure rolls the whole
    /// settlement back.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn verify_payment(&self, payment_id: Uuid) -> Result<PaymentView, ServiceError> {
        let db = self.db.as_ref();

        let result = db
            .transaction::<_, (payment::Model, order::Model, Vec<Deduction>), ServiceError>(
                move |txn| {
                    Box::pin(async move { settle(txn, payment_id).await })
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            });

        let (payment, order, deductions) = match result {
            Ok(parts) => parts,
            Err(e) => {
                PAYMENT_SETTLEMENT_FAILURES.inc();
                return Err(e);
            }
        };

        PAYMENT_SETTLEMENTS.inc();
        info!(
            payment_id = %payment.id,
            order_id = %order.id,
            deductions = deductions.len(),
            "Payment verified and order completed"
        );

        for deduction in &deductions {
            self.event_sender
                .send_or_log(Event::StockDeducted {
                    stock_id: deduction.stock_id,
                    qty: deduction.qty,
                    order_id: order.id,
                })
                .await;
        }
        self.event_sender
            .send_or_log(Event::OrderCompleted(order.id))
            .await;
        self.event_sender
            .send_or_log(Event::PaymentVerified {
                payment_id: payment.id,
                order_id: order.id,
            })
            .await;

        Ok(payment.into())
    }

    /// Retrieves a payment by id.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn get_payment(&self, payment_id: Uuid) -> Result<PaymentView, ServiceError> {
        let payment = PaymentEntity::find_by_id(payment_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

        Ok(payment.into())
    }

    /// Lists payments, newest first.
    #[instrument(skip(self))]
    pub async fn list_payments(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<PaymentListView, ServiceError> {
        let page = page.max(1);
        let paginator = PaymentEntity::find()
            .order_by_desc(payment::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page.clamp(1, 100));

        let total = paginator.num_items().await?;
        let payments = paginator.fetch_page(page - 1).await?;

        Ok(PaymentListView {
            payments: payments.into_iter().map(PaymentView::from).collect(),
            total,
            page,
            per_page,
        })
    }
}

/// The settlement body. Runs entirely inside the caller's transaction.
async fn settle<C: ConnectionTrait>(
    txn: &C,
    payment_id: Uuid,
) -> Result<(payment::Model, order::Model, Vec<Deduction>), ServiceError> {
    let payment = PaymentEntity::find_by_id(payment_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

    let order = OrderEntity::find_by_id(payment.order_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
    if order.status != OrderStatus::Pending {
        return Err(ServiceError::Conflict(
            "Order status is not pending".to_string(),
        ));
    }

    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .order_by_asc(order_item::Column::CreatedAt)
        .all(txn)
        .await?;

    let branch_id = order.branch_id;
    let mut deductions = Vec::new();

    for item in &items {
        if item.quantity <= 0 {
            continue;
        }
        let Some(item_ref) = item.item_ref() else {
            continue;
        };

        match item_ref {
            ItemRef::Variant(_) => {
                let stock = find_stock_row(txn, item_ref, branch_id).await?.ok_or_else(
                    || ServiceError::NotFound("Product variant stock not found".to_string()),
                )?;
                if !deduct_stock(txn, stock.id, item.quantity).await? {
                    return Err(ServiceError::InsufficientStock(
                        "Product variant stock is insufficient".to_string(),
                    ));
                }
                deductions.push(Deduction {
                    stock_id: stock.id,
                    qty: item.quantity,
                });
                if let Some(branch) = branch_id {
                    record_sale_movement(txn, item_ref, branch, item.quantity, order.id).await?;
                }
            }
            ItemRef::Product(product_id) => {
                match find_stock_row(txn, item_ref, branch_id).await? {
                    Some(stock) => {
                        if !deduct_stock(txn, stock.id, item.quantity).await? {
                            return Err(ServiceError::InsufficientStock(
                                "Product stock is insufficient".to_string(),
                            ));
                        }
                        deductions.push(Deduction {
                            stock_id: stock.id,
                            qty: item.quantity,
                        });
                        if let Some(branch) = branch_id {
                            record_sale_movement(txn, item_ref, branch, item.quantity, order.id)
                                .await?;
                        }
                    }
                    None => {
                        let covered = deduct_across_variants(
                            txn,
                            product_id,
                            branch_id,
                            item.quantity,
                            order.id,
                            &mut deductions,
                        )
                        .await?;
                        if !covered {
                            return Err(ServiceError::InsufficientStock(
                                "Product stock is insufficient".to_string(),
                            ));
                        }
                    }
                }
            }
        }
    }

    let mut active: order::ActiveModel = order.into();
    active.status = Set(OrderStatus::Completed);
    active.updated_at = Set(Some(Utc::now()));
    let order = active.update(txn).await?;

    let mut active: payment::ActiveModel = payment.into();
    active.status = Set(PaymentStatus::Success);
    active.paid_at = Set(Some(Utc::now()));
    active.updated_at = Set(Some(Utc::now()));
    let payment = active.update(txn).await?;

    Ok((payment, order, deductions))
}

/// Finds the balance row for a product or variant, branch-scoped when the
/// order carries a branch.
async fn find_stock_row<C: ConnectionTrait>(
    txn: &C,
    item: ItemRef,
    branch_id: Option<Uuid>,
) -> Result<Option<product_stock::Model>, ServiceError> {
    let mut query = match item {
        ItemRef::Variant(variant_id) => {
            ProductStockEntity::find().filter(product_stock::Column::VariantId.eq(variant_id))
        }
        ItemRef::Product(product_id) => ProductStockEntity::find()
            .filter(product_stock::Column::ProductId.eq(product_id))
            .filter(product_stock::Column::VariantId.is_null()),
    };
    if let Some(branch) = branch_id {
        query = query.filter(product_stock::Column::BranchId.eq(branch));
    }

    Ok(query.one(txn).await?)
}

/// Conditionally decrements a balance row. The guard on the current value
/// makes the check-and-decrement a single statement, so two concurrent
/// settlements cannot both pass the availability check on the same row.
/// Returns false when the row no longer covers `qty`.
async fn deduct_stock<C: ConnectionTrait>(
    txn: &C,
    stock_id: Uuid,
    qty: i32,
) -> Result<bool, ServiceError> {
    let result = ProductStockEntity::update_many()
        .col_expr(
            product_stock::Column::Stock,
            Expr::col(product_stock::Column::Stock).sub(qty),
        )
        .col_expr(product_stock::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product_stock::Column::Id.eq(stock_id))
        .filter(product_stock::Column::Stock.gte(qty))
        .exec(txn)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Fallback for a bare product with no direct balance row: drains the
/// product's variant-level rows first-fit, in creation order, skipping
/// empty rows. Returns false when the rows together cannot cover `qty`;
/// the surrounding transaction then rolls every partial deduction back.
async fn deduct_across_variants<C: ConnectionTrait>(
    txn: &C,
    product_id: Uuid,
    branch_id: Option<Uuid>,
    qty: i32,
    order_id: Uuid,
    deductions: &mut Vec<Deduction>,
) -> Result<bool, ServiceError> {
    let variant_ids: Vec<Uuid> = ProductVariantEntity::find()
        .filter(product_variant::Column::ProductId.eq(product_id))
        .filter(product_variant::Column::DeletedAt.is_null())
        .all(txn)
        .await?
        .into_iter()
        .map(|variant| variant.id)
        .collect();

    let mut query = ProductStockEntity::find()
        .filter(product_stock::Column::VariantId.is_in(variant_ids))
        .order_by_asc(product_stock::Column::CreatedAt);
    if let Some(branch) = branch_id {
        query = query.filter(product_stock::Column::BranchId.eq(branch));
    }
    let rows = query.all(txn).await?;

    if rows.is_empty() {
        return Err(ServiceError::NotFound(
            "Product stock not found".to_string(),
        ));
    }

    let mut remaining = qty;
    for row in rows {
        if remaining <= 0 {
            break;
        }
        let available = row.stock;
        if available <= 0 {
            continue;
        }
        let deduction = available.min(remaining);
        if !deduct_stock(txn, row.id, deduction).await? {
            // The row changed under us; let the remainder fall through to
            // the next row or the final shortfall check.
            warn!(stock_id = %row.id, "Variant stock row drained concurrently, skipping");
            continue;
        }
        deductions.push(Deduction {
            stock_id: row.id,
            qty: deduction,
        });
        if let (Some(branch), Some(variant_id)) = (branch_id, row.variant_id) {
            record_sale_movement(txn, ItemRef::Variant(variant_id), branch, deduction, order_id)
                .await?;
        }
        remaining -= deduction;
    }

    Ok(remaining <= 0)
}

/// Appends one ledger entry for a deduction performed by settlement.
async fn record_sale_movement<C: ConnectionTrait>(
    txn: &C,
    item: ItemRef,
    branch_id: Uuid,
    qty: i32,
    order_id: Uuid,
) -> Result<(), ServiceError> {
    stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(item.product_id()),
        variant_id: Set(item.variant_id()),
        branch_id: Set(branch_id),
        reference_type: Set(MovementType::Sale),
        qty: Set(qty),
        reference_id: Set(Some(order_id)),
        created_at: Set(Utc::now()),
    }
    .insert(txn)
    .await?;

    Ok(())
}
