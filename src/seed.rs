//! Demo data used by `materialops-cli seed`.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::info;

use crate::{
    auth::{user, AuthService, AuthUser, Role},
    db::DbPool,
    entities::material,
    errors::ServiceError,
    services::{materials::CreateMaterialInput, MaterialService},
};

pub const SEED_ADMIN_EMAIL: &str = "admin@materialops.com";
pub const SEED_ADMIN_PASSWORD: &str = "admin123";
const SEED_ADMIN_NAME: &str = "Admin User";

struct SeedMaterial {
    name: &'static str,
    sku: &'static str,
    description: &'static str,
    quantity: i32,
    unit: &'static str,
    location: &'static str,
}

const SEED_MATERIALS: &[SeedMaterial] = &[
    SeedMaterial {
        name: "Steel Rod 10mm",
        sku: "MAT-001",
        description: "Carbon steel rod, 10mm diameter",
        quantity: 100,
        unit: "pieces",
        location: "Warehouse A - Shelf 1",
    },
    SeedMaterial {
        name: "Copper Wire 2mm",
        sku: "MAT-002",
        description: "Bare copper wire, 2mm gauge",
        quantity: 50,
        unit: "spools",
        location: "Warehouse A - Shelf 3",
    },
    SeedMaterial {
        name: "Aluminum Sheet",
        sku: "MAT-003",
        description: "Aluminum sheet, 1mm",
        quantity: 25,
        unit: "sheets",
        location: "Warehouse B - Rack 2",
    },
];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users_created: usize,
    pub materials_created: usize,
}

/// Inserts the admin account and starter materials; existing rows are left alone
pub async fn seed_demo_data(
    db: &DbPool,
    auth: &AuthService,
    materials: &MaterialService,
) -> Result<SeedReport, ServiceError> {
    let mut report = SeedReport::default();

    let existing_admin = user::Entity::find()
        .filter(user::Column::Email.eq(SEED_ADMIN_EMAIL))
        .one(db)
        .await?;
    let admin = match existing_admin {
        Some(admin) => admin,
        None => {
            report.users_created += 1;
            auth.create_user(
                SEED_ADMIN_EMAIL,
                SEED_ADMIN_NAME,
                SEED_ADMIN_PASSWORD,
                Role::Admin,
            )
            .await?
        }
    };
    let actor = AuthUser::from(&admin);

    for seed in SEED_MATERIALS {
        let exists = material::Entity::find()
            .filter(material::Column::Sku.eq(seed.sku))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        materials
            .create_material(
                CreateMaterialInput {
                    name: Some(seed.name.to_string()),
                    sku: Some(seed.sku.to_string()),
                    description: Some(seed.description.to_string()),
                    quantity: Some(seed.quantity),
                    unit: Some(seed.unit.to_string()),
                    location: Some(seed.location.to_string()),
                },
                &actor,
            )
            .await?;
        report.materials_created += 1;
    }

    info!(
        users_created = report.users_created,
        materials_created = report.materials_created,
        "Seed data applied"
    );
    Ok(report)
}
