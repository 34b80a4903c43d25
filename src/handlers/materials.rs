use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::{
        common::{created_response, parse_material_id, success_response, SuccessResponse},
        AppState,
    },
    services::materials::{CreateMaterialInput, MaterialDetail, MaterialView, UpdateMaterialInput},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Extension, Json,
};

/// List all materials, newest first
#[utoipa::path(
    get,
    path = "/materials",
    responses(
        (status = 200, description = "All materials", body = [MaterialView]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn list_materials(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let materials = state.material_service.list_materials().await?;
    Ok(success_response(materials))
}

/// Create a material
#[utoipa::path(
    post,
    path = "/materials",
    request_body = CreateMaterialInput,
    responses(
        (status = 201, description = "Material created", body = MaterialView),
        (status = 400, description = "Name or SKU missing", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already in use", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn create_material(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateMaterialInput>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(input) = payload?;
    let created = state.material_service.create_material(input, &user).await?;
    Ok(created_response(created))
}

/// Get one material with its recent movements
#[utoipa::path(
    get,
    path = "/materials/{id}",
    params(("id" = String, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material with up to 20 recent movements", body = MaterialDetail),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_material_id(&id)?;
    let material = state.material_service.get_material(id).await?;
    Ok(success_response(material))
}

/// Edit descriptive fields of a material
#[utoipa::path(
    patch,
    path = "/materials/{id}",
    params(("id" = String, Path, description = "Material id")),
    request_body = UpdateMaterialInput,
    responses(
        (status = 200, description = "Material updated", body = MaterialView),
        (status = 400, description = "Invalid field value", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already in use", body = crate::errors::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMaterialInput>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_material_id(&id)?;
    let Json(input) = payload?;
    let updated = state.material_service.update_material(id, input).await?;
    Ok(success_response(updated))
}

/// Delete a material and its movements
#[utoipa::path(
    delete,
    path = "/materials/{id}",
    params(("id" = String, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material deleted", body = SuccessResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_material_id(&id)?;
    state.material_service.delete_material(id).await?;
    Ok(success_response(SuccessResponse::ok()))
}
