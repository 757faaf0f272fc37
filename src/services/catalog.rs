use crate::{
    db::DbPool,
    entities::{
        category::{self, Entity as CategoryEntity},
        product::{self, Entity as ProductEntity},
        product_variant::{self, Entity as ProductVariantEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateVariantRequest {
    #[validate(length(min = 1, message = "Variant name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "SKU is required"))]
    pub sku: String,
    pub price: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateVariantRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub price: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<product_variant::Model> for VariantView {
    fn from(model: product_variant::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            name: model.name,
            sku: model.sku,
            price: model.price,
            weight: model.weight,
            color: model.color,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub variants: Vec<VariantView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductView {
    fn from_parts(product: product::Model, variants: Vec<product_variant::Model>) -> Self {
        Self {
            id: product.id,
            name: product.name,
            slug: product.slug,
            price: product.price,
            description: product.description,
            category_id: product.category_id,
            image_url: product.image_url,
            variants: variants.into_iter().map(VariantView::from).collect(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Catalog service: categories, products and their variants. Deletions are
/// soft; removing a product soft-deletes its variants in the same
/// transaction so no orphaned variant stays sellable.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, request))]
    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let now = Utc::now();
        let saved = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            description: Set(request.description),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(self.db.as_ref())
        .await?;

        info!(category_id = %saved.id, "Category created");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        let categories = CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(self.db.as_ref())
            .await?;
        Ok(categories)
    }

    #[instrument(skip(self, request))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductView, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = self.db.as_ref();
        if let Some(category_id) = request.category_id {
            CategoryEntity::find_by_id(category_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;
        }

        let now = Utc::now();
        let saved = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.clone()),
            slug: Set(slugify(&request.name)),
            price: Set(request.price),
            description: Set(request.description),
            category_id: Set(request.category_id),
            image_url: Set(request.image_url),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(db)
        .await?;

        info!(product_id = %saved.id, "Product created");
        self.event_sender
            .send_or_log(Event::ProductCreated(saved.id))
            .await;

        Ok(ProductView::from_parts(saved, Vec::new()))
    }

    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductView>, ServiceError> {
        let db = self.db.as_ref();
        let products = ProductEntity::find()
            .filter(product::Column::DeletedAt.is_null())
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?;

        let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let mut variants_by_product: std::collections::HashMap<Uuid, Vec<product_variant::Model>> =
            std::collections::HashMap::new();
        if !product_ids.is_empty() {
            let variants = ProductVariantEntity::find()
                .filter(product_variant::Column::ProductId.is_in(product_ids))
                .filter(product_variant::Column::DeletedAt.is_null())
                .order_by_asc(product_variant::Column::CreatedAt)
                .all(db)
                .await?;
            for variant in variants {
                variants_by_product
                    .entry(variant.product_id)
                    .or_default()
                    .push(variant);
            }
        }

        Ok(products
            .into_iter()
            .map(|p| {
                let variants = variants_by_product.remove(&p.id).unwrap_or_default();
                ProductView::from_parts(p, variants)
            })
            .collect())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductView, ServiceError> {
        let (product, variants) = self.load_live_product(product_id).await?;
        Ok(ProductView::from_parts(product, variants))
    }

    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductView, ServiceError> {
        let db = self.db.as_ref();
        let (product, variants) = self.load_live_product(product_id).await?;

        if let Some(category_id) = request.category_id {
            CategoryEntity::find_by_id(category_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = request.name {
            active.slug = Set(slugify(&name));
            active.name = Set(name);
        }
        if let Some(price) = request.price {
            active.price = Set(Some(price));
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(category_id) = request.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(db).await?;

        info!(product_id = %saved.id, "Product updated");
        Ok(ProductView::from_parts(saved, variants))
    }

    /// Soft-deletes a product together with its variants. The cascade is
    /// orchestrated here, in one transaction, not by the schema.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        let (product, _) = self.load_live_product(product_id).await?;

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let now = Utc::now();

                ProductVariantEntity::update_many()
                    .col_expr(product_variant::Column::DeletedAt, Expr::value(now))
                    .filter(product_variant::Column::ProductId.eq(product.id))
                    .filter(product_variant::Column::DeletedAt.is_null())
                    .exec(txn)
                    .await?;

                let mut active: product::ActiveModel = product.into();
                active.deleted_at = Set(Some(now));
                active.updated_at = Set(Some(now));
                active.update(txn).await?;

                Ok(())
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })?;

        info!(product_id = %product_id, "Product deleted");
        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        Ok(())
    }

    #[instrument(skip(self, request), fields(product_id = %product_id))]
    pub async fn create_variant(
        &self,
        product_id: Uuid,
        request: CreateVariantRequest,
    ) -> Result<VariantView, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = self.db.as_ref();
        self.load_live_product(product_id).await?;
        self.ensure_unique_sku(&request.sku, None).await?;

        let now = Utc::now();
        let saved = product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            name: Set(request.name),
            sku: Set(request.sku),
            price: Set(request.price),
            weight: Set(request.weight),
            color: Set(request.color),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            deleted_at: Set(None),
        }
        .insert(db)
        .await?;

        info!(variant_id = %saved.id, product_id = %product_id, "Variant created");
        Ok(saved.into())
    }

    #[instrument(skip(self, request), fields(variant_id = %variant_id))]
    pub async fn update_variant(
        &self,
        variant_id: Uuid,
        request: UpdateVariantRequest,
    ) -> Result<VariantView, ServiceError> {
        let db = self.db.as_ref();
        let variant = self.load_live_variant(variant_id).await?;

        if let Some(ref sku) = request.sku {
            self.ensure_unique_sku(sku, Some(variant_id)).await?;
        }

        let mut active: product_variant::ActiveModel = variant.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(sku) = request.sku {
            active.sku = Set(sku);
        }
        if let Some(price) = request.price {
            active.price = Set(Some(price));
        }
        if let Some(weight) = request.weight {
            active.weight = Set(Some(weight));
        }
        if let Some(color) = request.color {
            active.color = Set(Some(color));
        }
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(db).await?;

        info!(variant_id = %saved.id, "Variant updated");
        Ok(saved.into())
    }

    #[instrument(skip(self), fields(variant_id = %variant_id))]
    pub async fn delete_variant(&self, variant_id: Uuid) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        let variant = self.load_live_variant(variant_id).await?;

        let mut active: product_variant::ActiveModel = variant.into();
        let now = Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        active.update(db).await?;

        info!(variant_id = %variant_id, "Variant deleted");
        Ok(())
    }

    async fn load_live_product(
        &self,
        product_id: Uuid,
    ) -> Result<(product::Model, Vec<product_variant::Model>), ServiceError> {
        let db = self.db.as_ref();
        let product = ProductEntity::find_by_id(product_id)
            .filter(product::Column::DeletedAt.is_null())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let variants = ProductVariantEntity::find()
            .filter(product_variant::Column::ProductId.eq(product.id))
            .filter(product_variant::Column::DeletedAt.is_null())
            .order_by_asc(product_variant::Column::CreatedAt)
            .all(db)
            .await?;

        Ok((product, variants))
    }

    async fn load_live_variant(
        &self,
        variant_id: Uuid,
    ) -> Result<product_variant::Model, ServiceError> {
        ProductVariantEntity::find_by_id(variant_id)
            .filter(product_variant::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product variant not found".to_string()))
    }

    async fn ensure_unique_sku(
        &self,
        sku: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = ProductVariantEntity::find()
            .filter(product_variant::Column::Sku.eq(sku))
            .filter(product_variant::Column::DeletedAt.is_null());
        if let Some(id) = exclude {
            query = query.filter(product_variant::Column::Id.ne(id));
        }
        if query.one(self.db.as_ref()).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU {} is already in use",
                sku
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_lowercases() {
        assert_eq!(slugify("Iced Latte (Large)"), "iced-latte-large");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
        assert_eq!(slugify("Déjà"), "d-j");
    }
}
