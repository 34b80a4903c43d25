use crate::{
    errors::ServiceError,
    handlers::{common::SuccessResponse, AppState},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Login request payload
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin@materialops.com")]
    pub email: Option<String>,
    #[schema(example = "admin123")]
    pub password: Option<String>,
}

/// Account returned after a successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[schema(example = "OPERATOR")]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: SessionUser,
}

/// Start a session
#[utoipa::path(
    post,
    path = "/auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = LoginResponse,
            headers(("Set-Cookie" = String, description = "token=<jwt>; HttpOnly; SameSite=Lax; Path=/; Max-Age=28800"))
        ),
        (status = 400, description = "Email or password missing", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(payload) = payload?;
    let (Some(email), Some(password)) = (
        payload.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ServiceError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let account = state.auth_service.authenticate(email, password).await?;
    let token = state.auth_service.generate_token(&account)?;
    let cookie = state.auth_service.session_cookie(&token);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            user: SessionUser {
                id: account.id,
                email: account.email,
                name: account.name,
                role: account.role,
            },
        }),
    ))
}

/// End the session by expiring the cookie
#[utoipa::path(
    delete,
    path = "/auth",
    responses(
        (status = 200, description = "Session cookie cleared", body = SuccessResponse),
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, state.auth_service.clear_session_cookie())],
        Json(SuccessResponse::ok()),
    )
}
