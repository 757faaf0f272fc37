use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ItemRef;

/// What caused a ledger movement.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    #[sea_orm(string_value = "sale")]
    #[strum(serialize = "sale")]
    Sale,
    #[sea_orm(string_value = "purchase")]
    #[strum(serialize = "purchase")]
    Purchase,
    #[sea_orm(string_value = "adjust")]
    #[strum(serialize = "adjust")]
    Adjust,
}

/// Append-only stock ledger entry. `qty` is the signed magnitude of the
/// movement, not a running balance; `reference_id` points at the order or
/// stock row that caused it. Never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub branch_id: Uuid,
    pub reference_type: MovementType,
    pub qty: i32,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn item_ref(&self) -> Option<ItemRef> {
        ItemRef::from_columns(self.product_id, self.variant_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
