use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::{
        common::{created_response, success_response},
        AppState,
    },
    services::movements::{MovementView, RecordMovementInput},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Extension, Json,
};

/// List the ledger, newest first
#[utoipa::path(
    get,
    path = "/movements",
    responses(
        (status = 200, description = "All movements with material and user summaries", body = [MovementView]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let movements = state.movement_service.list_movements().await?;
    Ok(success_response(movements))
}

/// Record a stock movement and adjust the material balance
#[utoipa::path(
    post,
    path = "/movements",
    request_body = RecordMovementInput,
    responses(
        (status = 201, description = "Movement recorded", body = MovementView),
        (status = 400, description = "Missing fields, invalid type or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
    ),
    tag = "movements"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<RecordMovementInput>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(input) = payload?;
    let movement = state.movement_service.record_movement(input, &user).await?;
    Ok(created_response(movement))
}
