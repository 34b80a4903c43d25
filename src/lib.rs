#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod seed;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, patch, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, Role};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub auth_service: Arc<auth::AuthService>,
    pub material_service: services::MaterialService,
    pub movement_service: services::MovementService,
}

impl AppState {
    /// Wires the services around one connection pool and event channel
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let auth_service = Arc::new(auth::AuthService::new(
            auth::AuthConfig::from(&config),
            db.clone(),
        ));
        Self {
            material_service: services::MaterialService::new(db.clone(), event_sender.clone()),
            movement_service: services::MovementService::new(db.clone(), event_sender.clone()),
            auth_service,
            event_sender,
            config,
            db,
        }
    }
}

/// Session, material and movement routes, each gated by its minimum role
pub fn api_routes() -> Router<AppState> {
    let session = Router::new().route(
        "/auth",
        post(handlers::auth::login).delete(handlers::auth::logout),
    );

    let materials_read = Router::new()
        .route("/materials", get(handlers::materials::list_materials))
        .route("/materials/:id", get(handlers::materials::get_material))
        .with_role(Role::READ);

    let materials_write = Router::new()
        .route("/materials", post(handlers::materials::create_material))
        .route("/materials/:id", patch(handlers::materials::update_material))
        .with_role(Role::WRITE);

    let materials_delete = Router::new()
        .route(
            "/materials/:id",
            delete(handlers::materials::delete_material),
        )
        .with_role(Role::DESTROY);

    let movements_read = Router::new()
        .route("/movements", get(handlers::movements::list_movements))
        .with_role(Role::READ);

    let movements_write = Router::new()
        .route("/movements", post(handlers::movements::record_movement))
        .with_role(Role::WRITE);

    Router::new()
        .merge(session)
        .merge(materials_read)
        .merge(materials_write)
        .merge(materials_delete)
        .merge(movements_read)
        .merge(movements_write)
}

/// CORS policy from configuration; `None` when nothing permits cross-origin use
pub fn cors_layer(cfg: &config::AppConfig) -> Option<CorsLayer> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_credentials(cfg.cors_allow_credentials),
        )
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Some(CorsLayer::permissive())
    } else {
        None
    }
}

/// Full application: health/status, the API at `/` and `/api/v1`, Swagger UI
pub fn build_router(state: AppState) -> Router {
    let api = api_routes();
    let auth_service = state.auth_service.clone();

    let mut app = Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .merge(api.clone())
        .nest("/api/v1", api)
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new());

    if let Some(cors) = cors_layer(&state.config) {
        app = app.layer(cors);
    } else {
        ::tracing::warn!("No CORS configuration; cross-origin requests will be refused");
    }

    app
        // Inject AuthService into request extensions for auth middleware
        .layer(axum::middleware::from_fn_with_state(
            auth_service,
            |State(auth): State<Arc<auth::AuthService>>,
             mut req: axum::extract::Request,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "healthy")]
    pub database: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub environment: String,
    pub timestamp: String,
}

/// Liveness plus database reachability
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = db::check_connection(&state.db).await.is_ok();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let label = if healthy { "healthy" } else { "unhealthy" };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            database: label.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}

/// Build and environment information
#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Service status", body = StatusResponse)),
    tag = "health"
)]
pub async fn api_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub mod prelude {
    pub use crate::auth::{AuthService, AuthUser, Role};
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::services::*;
    pub use crate::{build_router, AppState};
}
