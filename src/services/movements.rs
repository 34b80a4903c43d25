//! Stock-movement ledger.
//!
//! [`MovementService::record_movement`] is the only code path that changes a
//! material's balance after creation. The change is a single conditional
//! `UPDATE ... SET quantity = quantity - q WHERE id = ? AND quantity >= q`
//! inside the same transaction that appends the ledger row, so the stock
//! check and the write cannot be split by a concurrent request and a
//! rejected movement leaves nothing behind.

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
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, str::FromStr, sync::Arc};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{non_blank, MaterialSummary, UserSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovementView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub quantity: i32,
    pub note: Option<String>,
    pub material_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub material: Option<MaterialSummary>,
    pub user: Option<UserSummary>,
}

impl MovementView {
    fn build(
        entry: movement::Model,
        material: Option<MaterialSummary>,
        user: Option<UserSummary>,
    ) -> Self {
        Self {
            id: entry.id,
            movement_type: entry.movement_type,
            quantity: entry.quantity,
            note: non_blank(Some(entry.note.as_str())).map(str::to_string),
            material_id: entry.material_id,
            user_id: entry.user_id,
            created_at: entry.created_at,
            material,
            user,
        }
    }
}

/// Body of `POST /movements`
///
/// Fields are optional at the serde level so that a missing field yields the
/// endpoint's own validation message instead of a deserialisation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordMovementInput {
    #[serde(rename = "type")]
    #[schema(example = "INBOUND")]
    pub movement_type: Option<String>,
    #[schema(example = 50)]
    pub quantity: Option<i64>,
    pub note: Option<String>,
    pub material_id: Option<String>,
}

/// A movement request that passed field validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMovement {
    pub movement_type: MovementType,
    pub quantity: i32,
    pub material_id: Uuid,
    pub note: String,
}

impl RecordMovementInput {
    /// Field-level checks, done before touching the database
    pub fn validate(self) -> Result<ValidatedMovement, ServiceError> {
        let (Some(raw_type), Some(quantity), Some(raw_material_id)) = (
            non_blank(self.movement_type.as_deref()),
            self.quantity.filter(|q| *q != 0),
            non_blank(self.material_id.as_deref()),
        ) else {
            return Err(reject(
                "missing_fields",
                ServiceError::BadRequest("type, quantity, and materialId are required".to_string()),
            ));
        };

        let movement_type = MovementType::from_str(raw_type).map_err(|_| {
            reject(
                "invalid_type",
                ServiceError::BadRequest(
                    "type must be INBOUND, OUTBOUND, or TRANSFER".to_string(),
                ),
            )
        })?;

        let quantity = i32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                reject(
                    "invalid_quantity",
                    ServiceError::BadRequest("quantity must be a positive integer".to_string()),
                )
            })?;

        // An id that cannot be a material id cannot name an existing material
        let material_id = Uuid::parse_str(raw_material_id)
            .map_err(|_| reject("material_not_found", material_not_found()))?;

        Ok(ValidatedMovement {
            movement_type,
            quantity,
            material_id,
            note: self.note.unwrap_or_default(),
        })
    }
}

fn material_not_found() -> ServiceError {
    ServiceError::NotFound("Material not found".to_string())
}

fn balance_overflow() -> ServiceError {
    ServiceError::BadRequest(format!("Balance cannot exceed {}", i32::MAX))
}

fn reject(reason: &'static str, err: ServiceError) -> ServiceError {
    counter!("materialops.movements.rejected", 1, "reason" => reason);
    err
}

/// Outcome of a committed adjustment
struct Applied {
    movement: movement::Model,
    material: MaterialSummary,
    new_balance: i32,
}

/// Service for the movement ledger
#[derive(Clone)]
pub struct MovementService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl MovementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// All movements, newest first, with material and user summaries
    #[instrument(skip(self))]
    pub async fn list_movements(&self) -> Result<Vec<MovementView>, ServiceError> {
        let db = self.db_pool.as_ref();

        let rows = Movement::find()
            .find_also_related(Material)
            .order_by_desc(movement::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut user_ids: Vec<Uuid> = rows.iter().map(|(m, _)| m.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let users: HashMap<Uuid, UserSummary> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(user_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|u| {
                    (
                        u.id,
                        UserSummary {
                            name: u.name,
                            email: u.email,
                        },
                    )
                })
                .collect()
        };

        Ok(rows
            .into_iter()
            .map(|(entry, material)| {
                let user = users.get(&entry.user_id).cloned();
                let material = material.map(|m| MaterialSummary {
                    name: m.name,
                    sku: m.sku,
                });
                MovementView::build(entry, material, user)
            })
            .collect())
    }

    /// Validates and applies one movement for `actor`
    #[instrument(skip(self, input, actor), fields(user_id = %actor.user_id))]
    pub async fn record_movement(
        &self,
        input: RecordMovementInput,
        actor: &AuthUser,
    ) -> Result<MovementView, ServiceError> {
        let request = input.validate()?;
        let movement_type = request.movement_type;
        let quantity = request.quantity;
        let material_id = request.material_id;

        let applied = self.apply(request, actor.user_id).await.map_err(|e| {
            match &e {
                ServiceError::InsufficientStock { available } => {
                    counter!("materialops.movements.rejected", 1, "reason" => "insufficient_stock");
                    info!(
                        %material_id,
                        movement_type = %movement_type,
                        quantity,
                        available,
                        "Movement rejected: insufficient stock"
                    );
                }
                ServiceError::NotFound(_) => {
                    counter!("materialops.movements.rejected", 1, "reason" => "material_not_found");
                }
                ServiceError::BadRequest(_) => {
                    counter!("materialops.movements.rejected", 1, "reason" => "balance_overflow");
                }
                _ => {}
            }
            e
        })?;

        counter!(
            "materialops.movements.recorded",
            1,
            "type" => movement_type.to_string()
        );
        info!(
            movement_id = %applied.movement.id,
            %material_id,
            movement_type = %movement_type,
            quantity,
            new_balance = applied.new_balance,
            "Movement recorded"
        );
        self.event_sender.publish(Event::MovementRecorded {
            movement_id: applied.movement.id,
            material_id,
            movement_type,
            quantity,
            new_balance: applied.new_balance,
            user_id: actor.user_id,
        });

        Ok(MovementView::build(
            applied.movement,
            Some(applied.material),
            Some(UserSummary {
                name: actor.name.clone(),
                email: actor.email.clone(),
            }),
        ))
    }

    /// Balance change and ledger append as one transaction
    async fn apply(&self, request: ValidatedMovement, user_id: Uuid) -> Result<Applied, ServiceError> {
        self.db_pool
            .transaction::<_, Applied, ServiceError>(move |txn| {
                Box::pin(async move {
                    let ValidatedMovement {
                        movement_type,
                        quantity,
                        material_id,
                        note,
                    } = request;

                    // Must stay the first statement: SQLite then takes the write lock
                    // at once instead of upgrading a read lock mid-transaction.
                    let now = Utc::now();
                    let balance = Expr::col(material::Column::Quantity);
                    let mut update = Material::update_many()
                        .col_expr(
                            material::Column::Quantity,
                            if movement_type.is_decrement() {
                                balance.sub(quantity)
                            } else {
                                balance.add(quantity)
                            },
                        )
                        .col_expr(material::Column::UpdatedAt, Expr::value(now))
                        .filter(material::Column::Id.eq(material_id));
                    update = if movement_type.is_decrement() {
                        update.filter(material::Column::Quantity.gte(quantity))
                    } else {
                        update.filter(material::Column::Quantity.lte(i32::MAX - quantity))
                    };

                    if update.exec(txn).await?.rows_affected == 0 {
                        let available = Material::find_by_id(material_id)
                            .one(txn)
                            .await?
                            .ok_or_else(material_not_found)?
                            .quantity;
                        debug!(%material_id, available, quantity, "Conditional adjustment matched no row");
                        return Err(if movement_type.is_decrement() {
                            ServiceError::InsufficientStock { available }
                        } else {
                            balance_overflow()
                        });
                    }

                    let movement = movement::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        movement_type: Set(movement_type),
                        quantity: Set(quantity),
                        note: Set(note),
                        material_id: Set(material_id),
                        user_id: Set(user_id),
                        created_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    let current = Material::find_by_id(material_id)
                        .one(txn)
                        .await?
                        .ok_or_else(material_not_found)?;

                    Ok(Applied {
                        movement,
                        material: MaterialSummary {
                            name: current.name,
                            sku: current.sku,
                        },
                        new_balance: current.quantity,
                    })
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
    }
}
