use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MaterialOps API",
        version = "0.1.0",
        description = r#"
# MaterialOps Inventory API

Tracks materials (SKU, on-hand quantity, location) and the append-only ledger
of stock movements recorded against them.

## Authentication

`POST /auth` sets an HTTP-only `token` cookie valid for 8 hours. API clients
may send the same JWT as `Authorization: Bearer <token>`.

## Roles

| Role | May |
|------|-----|
| `VIEWER` | read materials and movements |
| `OPERATOR` | create and edit materials, record movements |
| `ADMIN` | delete materials |

Every route is served at the root and under `/api/v1`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Session endpoints"),
        (name = "materials", description = "Material store"),
        (name = "movements", description = "Stock-movement ledger"),
        (name = "health", description = "Health and status endpoints")
    ),
    paths(
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::materials::list_materials,
        crate::handlers::materials::create_material,
        crate::handlers::materials::get_material,
        crate::handlers::materials::update_material,
        crate::handlers::materials::delete_material,
        crate::handlers::movements::list_movements,
        crate::handlers::movements::record_movement,
        crate::health_check,
        crate::api_status,
    ),
    components(
        schemas(
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::SessionUser,
            crate::handlers::common::SuccessResponse,
            crate::services::materials::MaterialView,
            crate::services::materials::MaterialDetail,
            crate::services::materials::MaterialMovementView,
            crate::services::materials::CreateMaterialInput,
            crate::services::materials::UpdateMaterialInput,
            crate::services::movements::MovementView,
            crate::services::movements::RecordMovementInput,
            crate::services::MaterialSummary,
            crate::services::UserSummary,
            crate::entities::movement::MovementType,
            crate::auth::Role,
            crate::HealthResponse,
            crate::StatusResponse,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    security(
        ("session_cookie" = []),
        ("bearer_auth" = [])
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::auth::SESSION_COOKIE,
                ))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
