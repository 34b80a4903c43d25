#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use materialops_api::{
    auth::{user, AuthService, Role},
    config::AppConfig,
    db,
    events::{self, EventSender},
    AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "k7Q2m9Xv4Lp8Rz1Tn6Wb3Yc5Hd0Fj2Gs8Ke4Ua7Io1Pl9Mq3Nr6St0Vw5Xy2Zb4Cd";
pub const TEST_PASSWORD: &str = "password123";

/// A seeded account and the session token issued for it.
#[derive(Clone)]
pub struct TestUser {
    pub model: user::Model,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.model.id
    }
}

/// Application wired to a throwaway SQLite file, with one account per role.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub viewer: TestUser,
    pub operator: TestUser,
    pub admin: TestUser,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_pool(1).await
    }

    /// Same wiring over a pool of `connections`, so concurrent requests really contend.
    pub async fn with_pool(connections: u32) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("materialops_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        cfg.db_max_connections = connections;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = EventSender::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = materialops_api::build_router(state.clone());

        let viewer = Self::seed_user(&state.auth_service, "viewer@example.com", Role::Viewer).await;
        let operator =
            Self::seed_user(&state.auth_service, "operator@example.com", Role::Operator).await;
        let admin = Self::seed_user(&state.auth_service, "admin@example.com", Role::Admin).await;

        Self {
            router,
            state,
            viewer,
            operator,
            admin,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    async fn seed_user(auth: &AuthService, email: &str, role: Role) -> TestUser {
        let name = format!("{role} User");
        let model = auth
            .create_user(email, &name, TEST_PASSWORD, role)
            .await
            .expect("seed test user");
        let token = auth.generate_token(&model).expect("issue test token");
        TestUser { model, token }
    }

    /// Inserts an account whose stored role name bypasses the enum.
    pub async fn user_with_raw_role(&self, email: &str, role: &str) -> TestUser {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set("Raw Role".to_string()),
            password_hash: Set(String::new()),
            role: Set(role.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("insert raw-role user");
        let token = self
            .state
            .auth_service
            .generate_token(&model)
            .expect("issue raw-role token");
        TestUser { model, token }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Sends a request, authenticating through the session cookie when a token is given.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        send(self.router(), method, uri, body, token).await
    }

    pub async fn request_as(
        &self,
        user: &TestUser,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(&user.token)).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(json_body(body))
            .expect("failed to build request");
        self.router()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a material as the operator and returns the response body.
    pub async fn create_material(&self, sku: &str, name: &str, quantity: i64) -> Value {
        let response = self
            .request_as(
                &self.operator,
                Method::POST,
                "/materials",
                Some(serde_json::json!({ "name": name, "sku": sku, "quantity": quantity })),
            )
            .await;
        assert_eq!(response.status(), 201, "material creation should succeed");
        response_json(response).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

fn json_body(body: Option<Value>) -> Body {
    match body {
        Some(json) => Body::from(serde_json::to_vec(&json).expect("serialize json request body")),
        None => Body::empty(),
    }
}

/// Request helper usable from spawned tasks.
pub async fn send(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(tok) = token {
        builder = builder.header(header::COOKIE, format!("token={tok}"));
    }
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }

    let request = builder
        .body(json_body(body))
        .expect("failed to build request");
    router
        .oneshot(request)
        .await
        .expect("router error during test request")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
