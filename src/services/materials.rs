use crate::{
    auth::{user, AuthUser},
    db::DbPool,
    entities::{
        material::{self, Entity as Material},
        movement::{self, Entity as Movement, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{is_unique_violation, non_blank, UserSummary};

/// Number of ledger entries returned with a single material
pub const RECENT_MOVEMENTS_LIMIT: u64 = 20;

const DEFAULT_UNIT: &str = "pieces";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialView {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub description: String,
    pub quantity: i32,
    pub unit: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<material::Model> for MaterialView {
    fn from(model: material::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            sku: model.sku,
            description: model.description,
            quantity: model.quantity,
            unit: model.unit,
            location: model.location,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Ledger entry as listed under its material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialMovementView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: i32,
    pub note: Option<String>,
    pub material_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user: Option<UserSummary>,
}

/// Material with its most recent movements, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MaterialDetail {
    #[serde(flatten)]
    pub material: MaterialView,
    pub movements: Vec<MaterialMovementView>,
}

/// Body of `POST /materials`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateMaterialInput {
    #[schema(example = "Bolt")]
    pub name: Option<String>,
    #[schema(example = "X-1")]
    pub sku: Option<String>,
    pub description: Option<String>,
    /// Starting balance; recorded as an INBOUND movement when positive
    #[schema(example = 0)]
    pub quantity: Option<i32>,
    #[schema(example = "pieces")]
    pub unit: Option<String>,
    pub location: Option<String>,
}

/// Body of `PATCH /materials/{id}`; absent fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMaterialInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub location: Option<String>,
}

fn material_not_found() -> ServiceError {
    ServiceError::NotFound("Material not found".to_string())
}

fn duplicate_sku() -> ServiceError {
    ServiceError::Conflict("A material with this SKU already exists".to_string())
}

fn unwrap_txn(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

/// Service for the material store
#[derive(Clone)]
pub struct MaterialService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl MaterialService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// All materials, newest first
    #[instrument(skip(self))]
    pub async fn list_materials(&self) -> Result<Vec<MaterialView>, ServiceError> {
        let materials = Material::find()
            .order_by_desc(material::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(materials.into_iter().map(MaterialView::from).collect())
    }

    /// One material with up to [`RECENT_MOVEMENTS_LIMIT`] recent movements
    #[instrument(skip(self))]
    pub async fn get_material(&self, id: Uuid) -> Result<MaterialDetail, ServiceError> {
        let db = self.db_pool.as_ref();

        let material = Material::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(material_not_found)?;

        let movements = Movement::find()
            .filter(movement::Column::MaterialId.eq(id))
            .find_also_related(user::Entity)
            .order_by_desc(movement::Column::CreatedAt)
            .limit(RECENT_MOVEMENTS_LIMIT)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(MaterialDetail {
            material: material.into(),
            movements: movements
                .into_iter()
                .map(|(entry, actor)| MaterialMovementView {
                    id: entry.id,
                    movement_type: entry.movement_type,
                    quantity: entry.quantity,
                    note: non_blank(Some(entry.note.as_str())).map(str::to_string),
                    material_id: entry.material_id,
                    user_id: entry.user_id,
                    created_at: entry.created_at,
                    user: actor.map(|u| UserSummary {
                        name: u.name,
                        email: u.email,
                    }),
                })
                .collect(),
        })
    }

    /// Creates a material and, for a positive starting balance, its seed INBOUND movement
    #[instrument(skip(self, input, actor), fields(user_id = %actor.user_id))]
    pub async fn create_material(
        &self,
        input: CreateMaterialInput,
        actor: &AuthUser,
    ) -> Result<MaterialView, ServiceError> {
        let (Some(name), Some(sku)) = (
            non_blank(input.name.as_deref()),
            non_blank(input.sku.as_deref()),
        ) else {
            return Err(ServiceError::BadRequest(
                "Name and SKU are required".to_string(),
            ));
        };
        let quantity = input.quantity.unwrap_or(0);
        if quantity < 0 {
            return Err(ServiceError::BadRequest(
                "Quantity must be a non-negative integer".to_string(),
            ));
        }

        let now = Utc::now();
        let new_material = material::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            sku: Set(sku.to_string()),
            description: Set(input.description.unwrap_or_default()),
            quantity: Set(quantity),
            unit: Set(non_blank(input.unit.as_deref())
                .unwrap_or(DEFAULT_UNIT)
                .to_string()),
            location: Set(input.location.unwrap_or_default()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let actor_id = actor.user_id;
        let seed_note = format!("Initial creation by {}", actor.email);

        let created = self
            .db_pool
            .transaction::<_, material::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    // Insert first; the unique index on sku reports duplicates.
                    let created = new_material.insert(txn).await.map_err(|e| {
                        if is_unique_violation(&e) {
                            duplicate_sku()
                        } else {
                            ServiceError::db_error(e)
                        }
                    })?;

                    if created.quantity > 0 {
                        movement::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            movement_type: Set(MovementType::Inbound),
                            quantity: Set(created.quantity),
                            note: Set(seed_note),
                            material_id: Set(created.id),
                            user_id: Set(actor_id),
                            created_at: Set(created.created_at),
                        }
                        .insert(txn)
                        .await?;
                    }

                    Ok(created)
                })
            })
            .await
            .map_err(unwrap_txn)?;

        counter!("materialops.materials.created", 1);
        info!(
            material_id = %created.id,
            sku = %created.sku,
            quantity = created.quantity,
            "Material created"
        );
        self.event_sender.publish(Event::MaterialCreated {
            material_id: created.id,
            sku: created.sku.clone(),
            quantity: created.quantity,
        });

        Ok(created.into())
    }

    /// Partial edit of descriptive fields; the balance is never touched here
    #[instrument(skip(self, input))]
    pub async fn update_material(
        &self,
        id: Uuid,
        input: UpdateMaterialInput,
    ) -> Result<MaterialView, ServiceError> {
        let db = self.db_pool.as_ref();

        let existing = Material::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(material_not_found)?;

        let mut active: material::ActiveModel = existing.clone().into();

        if let Some(name) = input.name.as_deref() {
            let name = non_blank(Some(name))
                .ok_or_else(|| ServiceError::BadRequest("Name cannot be empty".to_string()))?;
            active.name = Set(name.to_string());
        }
        if let Some(sku) = input.sku.as_deref() {
            let sku = non_blank(Some(sku))
                .ok_or_else(|| ServiceError::BadRequest("SKU cannot be empty".to_string()))?;
            if sku != existing.sku {
                let taken = Material::find()
                    .filter(material::Column::Sku.eq(sku))
                    .filter(material::Column::Id.ne(id))
                    .one(db)
                    .await
                    .map_err(ServiceError::db_error)?;
                if taken.is_some() {
                    return Err(duplicate_sku());
                }
            }
            active.sku = Set(sku.to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(unit) = input.unit {
            active.unit = Set(unit);
        }
        if let Some(location) = input.location {
            active.location = Set(location);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await.map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_sku()
            } else {
                warn!(material_id = %id, error = %e, "Material update failed");
                ServiceError::InternalError(format!("Failed to update material: {e}"))
            }
        })?;

        info!(material_id = %id, "Material updated");
        self.event_sender
            .publish(Event::MaterialUpdated { material_id: id });

        Ok(updated.into())
    }

    /// Removes a material together with its movements
    #[instrument(skip(self))]
    pub async fn delete_material(&self, id: Uuid) -> Result<(), ServiceError> {
        let movements_removed = self
            .db_pool
            .transaction::<_, u64, ServiceError>(move |txn| {
                Box::pin(async move {
                    Material::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(material_not_found)?;

                    let removed = Movement::delete_many()
                        .filter(movement::Column::MaterialId.eq(id))
                        .exec(txn)
                        .await?
                        .rows_affected;

                    Material::delete_by_id(id).exec(txn).await?;
                    Ok(removed)
                })
            })
            .await
            .map_err(unwrap_txn)?;

        counter!("materialops.materials.deleted", 1);
        info!(material_id = %id, movements_removed, "Material deleted");
        self.event_sender.publish(Event::MaterialDeleted {
            material_id: id,
            movements_removed,
        });

        Ok(())
    }
}
