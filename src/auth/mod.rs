/*!
 * # Authentication and Authorization Module
 *
 * Session credentials are HS256 JWTs carried in an HTTP-only `token` cookie
 * (an `Authorization: Bearer` header is accepted as well for API clients).
 *
 * [`auth_middleware`] validates the token and re-loads the account on every
 * request, so a removed user or a changed role takes effect immediately.
 * [`role_middleware`] then applies the role hierarchy from [`rbac`].
 */

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{config::AppConfig, errors::ServiceError};

// Entity modules
pub mod user;

// Feature modules
mod password;
pub mod rbac;

// Re-exports
pub use password::{hash_password, verify_password};
pub use rbac::{role_rank, role_satisfies, Role};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // Subject (user ID)
    pub email: String, // User's email
    pub role: String,  // Role at issue time; the stored role wins on each request
    pub jti: String,   // JWT ID (unique identifier for this token)
    pub iat: i64,      // Issued at time
    pub exp: i64,      // Expiration time
}

/// Authenticated user, attached to request extensions by [`auth_middleware`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl AuthUser {
    /// Check if the user's role ranks at least `required`
    pub fn has_role_at_least(&self, required: Role) -> bool {
        role_satisfies(&self.role, required)
    }
}

impl From<&user::Model> for AuthUser {
    fn from(model: &user::Model) -> Self {
        Self {
            user_id: model.id,
            email: model.email.clone(),
            name: model.name.clone(),
            role: model.role.clone(),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiration: Duration,
    pub cookie_secure: bool,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_expiration: Duration, cookie_secure: bool) -> Self {
        Self {
            jwt_secret,
            token_expiration,
            cookie_secure,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
            cfg.cookie_secure,
        )
    }
}

/// Authentication service that handles credential checks and token issuance
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Generate a session JWT for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Check an email/password pair against the stored account
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model, AuthError> {
        let found = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(AuthError::Database)?;

        let Some(account) = found else {
            password::verify_against_dummy(password);
            counter!("materialops.auth.login", 1, "outcome" => "unknown_user");
            debug!("Login attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &account.password_hash) {
            counter!("materialops.auth.login", 1, "outcome" => "bad_password");
            warn!(user_id = %account.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        counter!("materialops.auth.login", 1, "outcome" => "success");
        info!(user_id = %account.id, role = %account.role, "User logged in");
        Ok(account)
    }

    /// Load the account a token refers to, with its current role
    pub async fn resolve_user(&self, claims: &Claims) -> Result<AuthUser, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(AuthError::Database)?
            .ok_or(AuthError::InvalidToken)?;
        Ok(AuthUser::from(&account))
    }

    /// Create an account with an Argon2id password hash
    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> Result<user::Model, AuthError> {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.trim().to_string()),
            name: Set(name.trim().to_string()),
            password_hash: Set(hash_password(password)?),
            role: Set(role.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AuthError::EmailTaken
            } else {
                AuthError::Database(e)
            }
        })?;

        info!(user_id = %created.id, role = %created.role, "User created");
        Ok(created)
    }

    /// `Set-Cookie` value carrying a freshly issued token
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.config.token_expiration.as_secs()
        );
        if self.config.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that expires the session cookie
    pub fn clear_session_cookie(&self) -> String {
        let mut cookie = format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
        if self.config.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Database error: {0}")]
    Database(sea_orm::DbErr),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuth | AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::Unauthorized("Unauthorized".to_string())
            }
            AuthError::InvalidCredentials => {
                ServiceError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::InsufficientPermissions => ServiceError::Forbidden("Forbidden".to_string()),
            AuthError::EmailTaken => ServiceError::Conflict("Email already registered".to_string()),
            AuthError::TokenCreation(msg) => {
                ServiceError::InternalError(format!("Token creation failed: {msg}"))
            }
            AuthError::Hash(msg) => ServiceError::HashError(msg),
            AuthError::Database(e) => ServiceError::DatabaseError(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Pull the session token from the `token` cookie, falling back to a bearer header
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Role middleware to check the authenticated user against a minimum role
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role_at_least(required_role) {
        debug!(
            user_id = %user.user_id,
            role = %user.role,
            required = %required_role,
            "Role requirement not met"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that validates the session token and loads the user
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return ServiceError::InternalError(
                "Authentication service not available".to_string(),
            )
            .into_response();
        }
    };

    let auth_result = match extract_token(request.headers()) {
        Some(token) => match auth_service.validate_token(&token) {
            Ok(claims) => auth_service.resolve_user(&claims).await,
            Err(e) => Err(e),
        },
        None => Err(AuthError::MissingAuth),
    };

    match auth_result {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> AuthService {
        AuthService::new(
            AuthConfig::new(
                "k7Q2m9Xv4Lp8Rz1Tn6Wb3Yc5Hd0Fj2Gs8Ke4Ua7Io1Pl9Mq3Nr6St0Vw5Xy2Zb4Cd".to_string(),
                Duration::from_secs(28_800),
                false,
            ),
            Arc::new(DatabaseConnection::Disconnected),
        )
    }

    fn account(role: &str) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "op@materialops.com".to_string(),
            name: "Op".to_string(),
            password_hash: String::new(),
            role: role.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_validates_with_eight_hour_expiry() {
        let svc = service();
        let user = account("OPERATOR");
        let token = svc.generate_token(&user).unwrap();
        let claims = svc.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, "OPERATOR");
        assert_eq!(claims.exp - claims.iat, 28_800);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let svc = service();
        let other = AuthService::new(
            AuthConfig::new("x".repeat(64), Duration::from_secs(600), false),
            Arc::new(DatabaseConnection::Disconnected),
        );
        let token = other.generate_token(&account("ADMIN")).unwrap();
        assert!(matches!(
            svc.validate_token(&token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            svc.validate_token("garbage"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "old@materialops.com".to_string(),
            role: "ADMIN".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 40_000,
            exp: now - 3_600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(svc.config.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            svc.validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn cookie_attributes() {
        let svc = service();
        assert_eq!(
            svc.session_cookie("abc"),
            "token=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=28800"
        );
        assert!(svc.clear_session_cookie().contains("Max-Age=0"));

        let mut secure = service();
        secure.config.cookie_secure = true;
        assert!(secure.session_cookie("abc").ends_with("; Secure"));
    }

    #[test]
    fn token_is_taken_from_cookie_before_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=from-cookie"),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));

        headers.remove(header::COOKIE);
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn auth_errors_map_to_expected_statuses() {
        use axum::http::StatusCode;
        assert_eq!(
            ServiceError::from(AuthError::MissingAuth).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::from(AuthError::InsufficientPermissions).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::from(AuthError::InvalidCredentials).response_message(),
            "Invalid credentials"
        );
    }
}
