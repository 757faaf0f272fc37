use crate::{
    db::DbPool,
    entities::branch::{self, Entity as BranchEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, message = "Branch name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Branch code is required"))]
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBranchRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub is_active: Option<bool>,
}

/// Service for branch management.
#[derive(Clone)]
pub struct BranchService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl BranchService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, request))]
    pub async fn create_branch(
        &self,
        request: CreateBranchRequest,
    ) -> Result<branch::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = self.db.as_ref();
        let exists = BranchEntity::find()
            .filter(branch::Column::Code.eq(request.code.clone()))
            .one(db)
            .await?;
        if exists.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Branch code {} is already in use",
                request.code
            )));
        }

        let now = Utc::now();
        let saved = branch::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            code: Set(request.code),
            address: Set(request.address),
            phone: Set(request.phone),
            email: Set(request.email),
            city: Set(request.city),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(db)
        .await?;

        info!(branch_id = %saved.id, code = %saved.code, "Branch created");
        self.event_sender
            .send_or_log(Event::BranchCreated(saved.id))
            .await;

        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn list_branches(&self) -> Result<Vec<branch::Model>, ServiceError> {
        let branches = BranchEntity::find()
            .order_by_asc(branch::Column::Name)
            .all(self.db.as_ref())
            .await?;
        Ok(branches)
    }

    #[instrument(skip(self), fields(branch_id = %branch_id))]
    pub async fn get_branch(&self, branch_id: Uuid) -> Result<branch::Model, ServiceError> {
        BranchEntity::find_by_id(branch_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Branch not found".to_string()))
    }

    #[instrument(skip(self, request), fields(branch_id = %branch_id))]
    pub async fn update_branch(
        &self,
        branch_id: Uuid,
        request: UpdateBranchRequest,
    ) -> Result<branch::Model, ServiceError> {
        let branch = self.get_branch(branch_id).await?;

        let mut active: branch::ActiveModel = branch.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(address) = request.address {
            active.address = Set(Some(address));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(city) = request.city {
            active.city = Set(Some(city));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(self.db.as_ref()).await?;

        info!(branch_id = %saved.id, "Branch updated");
        Ok(saved)
    }

    /// Branches are deactivated, not removed; stock and order history keep
    /// pointing at them.
    #[instrument(skip(self), fields(branch_id = %branch_id))]
    pub async fn deactivate_branch(&self, branch_id: Uuid) -> Result<branch::Model, ServiceError> {
        let branch = self.get_branch(branch_id).await?;

        let mut active: branch::ActiveModel = branch.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(self.db.as_ref()).await?;

        info!(branch_id = %saved.id, "Branch deactivated");
        Ok(saved)
    }
}
