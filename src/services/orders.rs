use crate::{
    db::DbPool,
    entities::{
        customer::Entity as CustomerEntity,
        order::{self, Entity as OrderEntity, OrderStatus},
        order_item::{self, Entity as OrderItemEntity},
        product::{self, Entity as ProductEntity},
        product_stock::{self, Entity as ProductStockEntity},
        product_variant::{self, Entity as ProductVariantEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::ItemRef,
};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref ORDER_DRAFT_WRITES: IntCounter = IntCounter::new(
        "pos_order_draft_writes_total",
        "Total number of order draft create/merge operations"
    )
    .expect("metric can be created");
    static ref ORDER_DRAFT_FAILURES: IntCounter = IntCounter::new(
        "pos_order_draft_failures_total",
        "Total number of failed order draft operations"
    )
    .expect("metric can be created");
}

/// One requested line of a draft order. Exactly one of `product_id` /
/// `variant_id` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DraftItemInput {
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<DraftItemInput>,
    pub notes: Option<String>,
    /// Draft order to merge into; a completed or cancelled order here is
    /// treated as absent and a fresh order is opened instead.
    pub order_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderRequest {
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub qty: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderView {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub items: Vec<OrderItemView>,
    pub invoice_number: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    /// subtotal + tax_amount - discount_amount, derived, never stored
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderView {
    pub fn from_parts(order: order::Model, items: Vec<order_item::Model>) -> Self {
        let total_amount = order.total_amount();
        Self {
            id: order.id,
            customer_id: order.customer_id,
            branch_id: order.branch_id,
            user_id: order.user_id,
            items: items
                .into_iter()
                .map(|item| OrderItemView {
                    id: item.id,
                    order_id: item.order_id,
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    qty: item.quantity,
                    price: item.price,
                    subtotal: item.subtotal,
                })
                .collect(),
            invoice_number: order.invoice_number,
            subtotal: order.subtotal,
            tax_amount: order.tax_amount,
            discount_amount: order.discount_amount,
            total_amount,
            status: order.status,
            notes: order.notes,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListView {
    pub orders: Vec<OrderView>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// A normalized draft line after in-request aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub item: ItemRef,
    pub quantity: i32,
    pub price: Decimal,
}

impl DraftLine {
    fn subtotal(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

/// Collapses the request payload so each product/variant appears once.
/// Duplicate keys sum their quantities; the last occurrence's price wins.
/// Input order is preserved for the surviving keys.
pub fn aggregate_items(items: &[DraftItemInput]) -> Result<Vec<DraftLine>, ServiceError> {
    let mut lines: Vec<DraftLine> = Vec::new();

    for input in items {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be greater than 0".to_string(),
            ));
        }
        let item = match (input.product_id, input.variant_id) {
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

        match lines.iter_mut().find(|line| line.item == item) {
            Some(line) => {
                line.quantity += input.quantity;
                line.price = input.price;
            }
            None => lines.push(DraftLine {
                item,
                quantity: input.quantity,
                price: input.price,
            }),
        }
    }

    Ok(lines)
}

fn generate_invoice_number() -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!("INV-{}-{}", Utc::now().timestamp_millis(), &entropy[..6])
}

fn sum_subtotals(items: &[order_item::Model]) -> Decimal {
    items.iter().map(|item| item.subtotal).sum()
}

/// Service for draft orders: incremental creation/merging of lines,
/// quantity edits, line removal and subtotal recomputation.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a draft order, or merges lines into an existing pending one.
    ///
    /// Validation, catalog resolution and the availability check all run
    /// before any write; the writes themselves share one transaction.
    #[instrument(skip(self, request), fields(order_id = ?request.order_id, items = request.items.len()))]
    pub async fn create_or_update(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderView, ServiceError> {
        request.validate().map_err(|e| {
            ORDER_DRAFT_FAILURES.inc();
            ServiceError::ValidationError(e.to_string())
        })?;

        let result = self.create_or_update_inner(request).await;
        match &result {
            Ok(_) => ORDER_DRAFT_WRITES.inc(),
            Err(_) => ORDER_DRAFT_FAILURES.inc(),
        }
        result
    }

    async fn create_or_update_inner(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderView, ServiceError> {
        let db = self.db.as_ref();

        let lines = aggregate_items(&request.items)?;

        let variant_products = self.resolve_catalog(&lines).await?;
        self.check_availability(&lines, request.branch_id).await?;

        // A completed/cancelled order is never resurrected; the create path
        // runs instead.
        let existing = match request.order_id {
            Some(order_id) => self
                .load_order_with_items(order_id)
                .await?
                .filter(|(order, _)| !order.status.is_terminal()),
            None => None,
        };

        let branch_id = request.branch_id;
        let user_id = request.user_id;
        let customer_id = request.customer_id;
        let notes = request.notes.clone();

        let (saved_order, saved_items, created) = db
            .transaction::<_, (order::Model, Vec<order_item::Model>, bool), ServiceError>(
                move |txn| {
                    let lines = lines.clone();
                    let variant_products = variant_products.clone();
                    let notes = notes.clone();
                    let existing = existing.clone();
                    Box::pin(async move {
                        match existing {
                            None => {
                                let (order, items) = insert_new_order(
                                    txn,
                                    &lines,
                                    &variant_products,
                                    notes,
                                    branch_id,
                                    user_id,
                                    customer_id,
                                )
                                .await?;
                                Ok((order, items, true))
                            }
                            Some((order, items)) => {
                                let (order, items) = merge_into_order(
                                    txn,
                                    order,
                                    items,
                                    lines,
                                    &variant_products,
                                    notes,
                                )
                                .await?;
                                Ok((order, items, false))
                            }
                        }
                    })
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            order_id = %saved_order.id,
            invoice_number = %saved_order.invoice_number,
            items = saved_items.len(),
            created = created,
            "Order draft saved"
        );

        let event = if created {
            Event::OrderCreated(saved_order.id)
        } else {
            Event::OrderUpdated(saved_order.id)
        };
        self.event_sender.send_or_log(event).await;

        Ok(OrderView::from_parts(saved_order, saved_items))
    }

    /// Batch-resolves every referenced variant and product; fails the whole
    /// request if any id is unknown or soft-deleted. Returns the variant to
    /// parent-product mapping used when persisting variant lines.
    async fn resolve_catalog(
        &self,
        lines: &[DraftLine],
    ) -> Result<HashMap<Uuid, Uuid>, ServiceError> {
        let db = self.db.as_ref();

        let variant_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.item.variant_id()).collect();
        let product_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.item.product_id()).collect();

        let mut variant_products = HashMap::new();
        if !variant_ids.is_empty() {
            let variants = ProductVariantEntity::find()
                .filter(product_variant::Column::Id.is_in(variant_ids.clone()))
                .filter(product_variant::Column::DeletedAt.is_null())
                .all(db)
                .await?;
            if variants.len() != variant_ids.len() {
                return Err(ServiceError::ValidationError(
                    "Product variant not found".to_string(),
                ));
            }
            for variant in variants {
                variant_products.insert(variant.id, variant.product_id);
            }
        }

        if !product_ids.is_empty() {
            let count = ProductEntity::find()
                .filter(product::Column::Id.is_in(product_ids.clone()))
                .filter(product::Column::DeletedAt.is_null())
                .count(db)
                .await?;
            if count != product_ids.len() as u64 {
                return Err(ServiceError::ValidationError(
                    "Product not found".to_string(),
                ));
            }
        }

        Ok(variant_products)
    }

    /// Requires a stock row with sufficient balance for every line, scoped
    /// to the branch when one was supplied. Runs before any write.
    async fn check_availability(
        &self,
        lines: &[DraftLine],
        branch_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let db = self.db.as_ref();

        let variant_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.item.variant_id()).collect();
        let product_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.item.product_id()).collect();

        let mut variant_stocks: HashMap<Uuid, i32> = HashMap::new();
        if !variant_ids.is_empty() {
            let mut query = ProductStockEntity::find()
                .filter(product_stock::Column::VariantId.is_in(variant_ids));
            if let Some(branch) = branch_id {
                query = query.filter(product_stock::Column::BranchId.eq(branch));
            }
            for row in query.all(db).await? {
                if let Some(variant_id) = row.variant_id {
                    variant_stocks.insert(variant_id, row.stock);
                }
            }
        }

        let mut product_stocks: HashMap<Uuid, i32> = HashMap::new();
        if !product_ids.is_empty() {
            let mut query = ProductStockEntity::find()
                .filter(product_stock::Column::ProductId.is_in(product_ids))
                .filter(product_stock::Column::VariantId.is_null());
            if let Some(branch) = branch_id {
                query = query.filter(product_stock::Column::BranchId.eq(branch));
            }
            for row in query.all(db).await? {
                if let Some(product_id) = row.product_id {
                    product_stocks.insert(product_id, row.stock);
                }
            }
        }

        for line in lines {
            let (available, what) = match line.item {
                ItemRef::Variant(variant_id) => (
                    variant_stocks.get(&variant_id),
                    "Product variant stock",
                ),
                ItemRef::Product(product_id) => {
                    (product_stocks.get(&product_id), "Product stock")
                }
            };
            match available {
                None => {
                    return Err(ServiceError::NotFound(format!("{} not found", what)));
                }
                Some(stock) if *stock < line.quantity => {
                    warn!(item = %line.item, requested = line.quantity, available = stock, "Draft rejected: insufficient stock");
                    return Err(ServiceError::InsufficientStock(format!(
                        "{} is insufficient",
                        what
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    async fn load_order_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<Option<(order::Model, Vec<order_item::Model>)>, ServiceError> {
        let db = self.db.as_ref();

        let order = match OrderEntity::find_by_id(order_id).one(db).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(Some((order, items)))
    }

    /// Retrieves an order with its lines.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        let (order, items) = self
            .load_order_with_items(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        Ok(OrderView::from_parts(order, items))
    }

    /// Lists orders, newest first, with their lines.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListView, ServiceError> {
        let db = self.db.as_ref();
        let page = page.max(1);

        let paginator = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, per_page.clamp(1, 100));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<order_item::Model>> = HashMap::new();
        if !order_ids.is_empty() {
            let items = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.is_in(order_ids))
                .order_by_asc(order_item::Column::CreatedAt)
                .all(db)
                .await?;
            for item in items {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }

        let views = orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                OrderView::from_parts(order, items)
            })
            .collect();

        Ok(OrderListView {
            orders: views,
            total,
            page,
            per_page,
        })
    }

    /// Reassigns the order's customer.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn update_order(
        &self,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderView, ServiceError> {
        let db = self.db.as_ref();

        let (order, items) = self
            .load_order_with_items(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let customer_id = request.customer_id.ok_or_else(|| {
            ServiceError::ValidationError("Customer ID is required".to_string())
        })?;
        CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;

        let mut active: order::ActiveModel = order.into();
        active.customer_id = Set(Some(customer_id));
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(db).await?;

        self.event_sender
            .send_or_log(Event::OrderUpdated(order.id))
            .await;

        Ok(OrderView::from_parts(order, items))
    }

    /// Sets a line's quantity and recomputes the order subtotal over all of
    /// the order's lines. Pending orders only.
    #[instrument(skip(self), fields(order_id = %order_id, order_item_id = %order_item_id))]
    pub async fn update_item_quantity(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
        quantity: i32,
    ) -> Result<OrderView, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let db = self.db.as_ref();
        let (order, items) = self
            .load_order_with_items(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        if order.status.is_terminal() {
            return Err(ServiceError::Conflict(
                "Order status is not editable".to_string(),
            ));
        }

        let target = items
            .iter()
            .find(|item| item.id == order_item_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound("Order item not found".to_string()))?;

        let (order, items) = db
            .transaction::<_, (order::Model, Vec<order_item::Model>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();

                    let mut active: order_item::ActiveModel = target.clone().into();
                    active.quantity = Set(quantity);
                    active.subtotal = Set(Decimal::from(quantity) * target.price);
                    active.updated_at = Set(Some(now));
                    let updated = active.update(txn).await?;

                    let items: Vec<order_item::Model> = items
                        .into_iter()
                        .map(|item| if item.id == updated.id { updated.clone() } else { item })
                        .collect();

                    let mut active: order::ActiveModel = order.into();
                    active.subtotal = Set(sum_subtotals(&items));
                    active.updated_at = Set(Some(now));
                    let order = active.update(txn).await?;

                    Ok((order, items))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(order_id = %order.id, order_item_id = %order_item_id, quantity = quantity, "Order item quantity updated");
        self.event_sender
            .send_or_log(Event::OrderUpdated(order.id))
            .await;

        Ok(OrderView::from_parts(order, items))
    }

    /// Removes a line and recomputes the order subtotal over the remaining
    /// lines. Pending orders only.
    #[instrument(skip(self), fields(order_id = %order_id, order_item_id = %order_item_id))]
    pub async fn remove_item(
        &self,
        order_id: Uuid,
        order_item_id: Uuid,
    ) -> Result<OrderView, ServiceError> {
        let db = self.db.as_ref();
        let (order, items) = self
            .load_order_with_items(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        if order.status.is_terminal() {
            return Err(ServiceError::Conflict(
                "Order status is not editable".to_string(),
            ));
        }

        if !items.iter().any(|item| item.id == order_item_id) {
            return Err(ServiceError::NotFound("Order item not found".to_string()));
        }

        let (order, items) = db
            .transaction::<_, (order::Model, Vec<order_item::Model>), ServiceError>(move |txn| {
                Box::pin(async move {
                    OrderItemEntity::delete_by_id(order_item_id).exec(txn).await?;

                    let remaining: Vec<order_item::Model> = items
                        .into_iter()
                        .filter(|item| item.id != order_item_id)
                        .collect();

                    let mut active: order::ActiveModel = order.into();
                    active.subtotal = Set(sum_subtotals(&remaining));
                    active.updated_at = Set(Some(Utc::now()));
                    let order = active.update(txn).await?;

                    Ok((order, remaining))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(order_id = %order.id, order_item_id = %order_item_id, "Order item removed");
        self.event_sender
            .send_or_log(Event::OrderItemRemoved {
                order_id: order.id,
                item_id: order_item_id,
            })
            .await;

        Ok(OrderView::from_parts(order, items))
    }

    /// Cancels a pending order. Terminal orders conflict.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        let db = self.db.as_ref();
        let (order, items) = self
            .load_order_with_items(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        if order.status.is_terminal() {
            return Err(ServiceError::Conflict(
                "Order status is not pending".to_string(),
            ));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled);
        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(db).await?;

        info!(order_id = %order.id, "Order cancelled");
        self.event_sender
            .send_or_log(Event::OrderCancelled(order.id))
            .await;

        Ok(OrderView::from_parts(order, items))
    }
}

async fn insert_new_order<C: sea_orm::ConnectionTrait>(
    txn: &C,
    lines: &[DraftLine],
    variant_products: &HashMap<Uuid, Uuid>,
    notes: Option<String>,
    branch_id: Option<Uuid>,
    user_id: Option<Uuid>,
    customer_id: Option<Uuid>,
) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
    let now = Utc::now();
    let subtotal: Decimal = lines.iter().map(DraftLine::subtotal).sum();

    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        branch_id: Set(branch_id),
        user_id: Set(user_id),
        customer_id: Set(customer_id),
        invoice_number: Set(generate_invoice_number()),
        subtotal: Set(subtotal),
        tax_amount: Set(Decimal::ZERO),
        discount_amount: Set(Decimal::ZERO),
        status: Set(OrderStatus::Pending),
        notes: Set(notes),
        created_at: Set(now),
        updated_at: Set(Some(now)),
    }
    .insert(txn)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create order");
        ServiceError::DatabaseError(e)
    })?;

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = new_item_active_model(order.id, line, variant_products, now)
            .insert(txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order.id, "Failed to create order item");
                ServiceError::DatabaseError(e)
            })?;
        items.push(item);
    }

    Ok((order, items))
}

async fn merge_into_order<C: sea_orm::ConnectionTrait>(
    txn: &C,
    order: order::Model,
    existing_items: Vec<order_item::Model>,
    mut lines: Vec<DraftLine>,
    variant_products: &HashMap<Uuid, Uuid>,
    notes: Option<String>,
) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
    let now = Utc::now();
    let mut items = Vec::with_capacity(existing_items.len() + lines.len());

    // Lines matching an existing item fold into it: quantity accumulates,
    // the incoming price replaces the stored one.
    for item in existing_items {
        let merged = match item.item_ref() {
            Some(key) => lines.iter().position(|line| line.item == key),
            None => None,
        };
        match merged {
            Some(index) => {
                let line = lines.remove(index);
                let quantity = item.quantity + line.quantity;
                let mut active: order_item::ActiveModel = item.into();
                active.quantity = Set(quantity);
                active.price = Set(line.price);
                active.subtotal = Set(Decimal::from(quantity) * line.price);
                active.updated_at = Set(Some(now));
                items.push(active.update(txn).await?);
            }
            None => items.push(item),
        }
    }

    // Whatever did not merge becomes a brand-new line.
    for line in &lines {
        let item = new_item_active_model(order.id, line, variant_products, now)
            .insert(txn)
            .await?;
        items.push(item);
    }

    let mut active: order::ActiveModel = order.into();
    active.subtotal = Set(sum_subtotals(&items));
    if let Some(notes) = notes {
        active.notes = Set(Some(notes));
    }
    active.updated_at = Set(Some(now));
    let order = active.update(txn).await?;

    Ok((order, items))
}

fn new_item_active_model(
    order_id: Uuid,
    line: &DraftLine,
    variant_products: &HashMap<Uuid, Uuid>,
    now: DateTime<Utc>,
) -> order_item::ActiveModel {
    let (product_id, variant_id) = match line.item {
        ItemRef::Product(product_id) => (Some(product_id), None),
        ItemRef::Variant(variant_id) => {
            (variant_products.get(&variant_id).copied(), Some(variant_id))
        }
    };

    order_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(product_id),
        variant_id: Set(variant_id),
        quantity: Set(line.quantity),
        price: Set(line.price),
        discount: Set(Decimal::ZERO),
        subtotal: Set(line.subtotal()),
        created_at: Set(now),
        updated_at: Set(Some(now)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn variant_line(id: Uuid, quantity: i32, price: Decimal) -> DraftItemInput {
        DraftItemInput {
            product_id: None,
            variant_id: Some(id),
            quantity,
            price,
        }
    }

    #[test]
    fn duplicate_keys_sum_quantity_and_keep_last_price() {
        let variant = Uuid::new_v4();
        let lines = aggregate_items(&[
            variant_line(variant, 2, dec!(1000)),
            variant_line(variant, 3, dec!(900)),
        ])
        .unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].price, dec!(900));
    }

    #[test]
    fn distinct_keys_stay_separate_in_input_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let lines = aggregate_items(&[
            variant_line(first, 1, dec!(100)),
            DraftItemInput {
                product_id: Some(second),
                variant_id: None,
                quantity: 4,
                price: dec!(50),
            },
        ])
        .unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].item, ItemRef::Variant(first));
        assert_eq!(lines[1].item, ItemRef::Product(second));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = aggregate_items(&[variant_line(Uuid::new_v4(), 0, dec!(10))]).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn missing_both_ids_is_rejected() {
        let err = aggregate_items(&[DraftItemInput {
            product_id: None,
            variant_id: None,
            quantity: 1,
            price: dec!(10),
        }])
        .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn both_ids_present_is_rejected() {
        let err = aggregate_items(&[DraftItemInput {
            product_id: Some(Uuid::new_v4()),
            variant_id: Some(Uuid::new_v4()),
            quantity: 1,
            price: dec!(10),
        }])
        .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn line_subtotal_is_quantity_times_price() {
        let line = DraftLine {
            item: ItemRef::Product(Uuid::new_v4()),
            quantity: 3,
            price: dec!(12.50),
        };
        assert_eq!(line.subtotal(), dec!(37.50));
    }
}
