use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Direction of a ledger entry
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    #[sea_orm(string_value = "INBOUND")]
    Inbound,
    #[sea_orm(string_value = "OUTBOUND")]
    Outbound,
    /// Leaves the material's stock; no destination is credited.
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
}

impl MovementType {
    /// True for types that draw down the on-hand balance.
    pub fn is_decrement(self) -> bool {
        matches!(self, MovementType::Outbound | MovementType::Transfer)
    }

    /// Signed change this movement applies to a balance.
    pub fn signed(self, quantity: i32) -> i32 {
        if self.is_decrement() {
            -quantity
        } else {
            quantity
        }
    }
}

/// Append-only ledger entry; rows are never updated
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    #[sea_orm(column_type = "Text")]
    pub note: String,
    pub material_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::material::Entity",
        from = "Column::MaterialId",
        to = "super::material::Column::Id"
    )]
    Material,
    #[sea_orm(
        belongs_to = "crate::auth::user::Entity",
        from = "Column::UserId",
        to = "crate::auth::user::Column::Id"
    )]
    User,
}

impl Related<super::material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Material.def()
    }
}

impl Related<crate::auth::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_only_the_three_upper_case_types() {
        assert_eq!(MovementType::from_str("INBOUND").unwrap(), MovementType::Inbound);
        assert_eq!(MovementType::from_str("OUTBOUND").unwrap(), MovementType::Outbound);
        assert_eq!(MovementType::from_str("TRANSFER").unwrap(), MovementType::Transfer);
        assert!(MovementType::from_str("inbound").is_err());
        assert!(MovementType::from_str("ADJUST").is_err());
        assert!(MovementType::from_str("").is_err());
    }

    #[test]
    fn decrementing_types_subtract() {
        assert_eq!(MovementType::Inbound.signed(5), 5);
        assert_eq!(MovementType::Outbound.signed(5), -5);
        assert_eq!(MovementType::Transfer.signed(5), -5);
        assert_eq!(MovementType::Outbound.to_string(), "OUTBOUND");
    }
}
