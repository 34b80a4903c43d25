/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Roles form a strict hierarchy. Each role carries a numeric rank and a role
 * satisfies a requirement when its rank is at least the required rank:
 *
 * | Role       | Rank | Grants                                   |
 * |------------|------|------------------------------------------|
 * | `VIEWER`   | 1    | read materials and movements             |
 * | `OPERATOR` | 2    | create/edit materials, record movements  |
 * | `ADMIN`    | 3    | delete materials                         |
 *
 * Role names that are not recognised rank 0 and satisfy nothing.
 */

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Viewer,
    Operator,
    Admin,
}

impl Role {
    pub fn rank(self) -> u8 {
        match self {
            Role::Viewer => 1,
            Role::Operator => 2,
            Role::Admin => 3,
        }
    }

    /// Minimum role for read endpoints.
    pub const READ: Role = Role::Viewer;
    /// Minimum role for create/edit and stock movements.
    pub const WRITE: Role = Role::Operator;
    /// Minimum role for destructive operations.
    pub const DESTROY: Role = Role::Admin;
}

/// Rank of a stored role name; 0 for anything unrecognised.
pub fn role_rank(role: &str) -> u8 {
    match Role::from_str(role) {
        Ok(role) => role.rank(),
        Err(_) => {
            warn!(role, "Unknown role name");
            0
        }
    }
}

/// Whether a user holding `role` may perform an operation requiring `required`.
pub fn role_satisfies(role: &str, required: Role) -> bool {
    role_rank(role) >= required.rank()
}
