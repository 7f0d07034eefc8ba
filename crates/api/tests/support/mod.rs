#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use hana_accounts::{PasswordHasher, UserRegistry};
use hana_api::{build_app, AppState};
use hana_metrics::MetricsService;
use hana_models::{Config, Role};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const ADMIN: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const BOUNDARY: &str = "hana-test-boundary";

pub struct TestApp {
    pub state: AppState,
    pub app: Router,
    // Keeps the data directory alive for the test's duration.
    pub data_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let data_dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.data.dir = data_dir.path().display().to_string();
        config.release.manifest_path = data_dir.path().join("release.toml").display().to_string();
        tweak(&mut config);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let registry = Arc::new(
            UserRegistry::new(pool, PasswordHasher::new(config.auth.max_password_bytes))
                .await
                .unwrap(),
        );
        registry
            .create_user(ADMIN, ADMIN_PASSWORD, Role::Admin)
            .await
            .unwrap();

        let metrics = Arc::new(MetricsService::new().unwrap());
        let state = AppState::new(config, registry, metrics).unwrap();
        let app = build_app(state.clone());

        Self {
            state,
            app,
            data_dir,
        }
    }

    pub fn token_for(&self, user: &str) -> String {
        self.state.auth.tokens().issue(user).unwrap()
    }

    pub async fn add_user(&self, name: &str, password: &str) {
        self.state
            .registry()
            .create_user(name, password, Role::User)
            .await
            .unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    with_bearer(Request::get(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn post(uri: &str, token: Option<&str>) -> Request<Body> {
    with_bearer(Request::post(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    with_bearer(Request::delete(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn login_form(username: &str, password: &str) -> Request<Body> {
    Request::post("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap()
}

pub fn csv_upload(uri: &str, file_name: &str, contents: &str, token: Option<&str>) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    );
    with_bearer(Request::post(uri), token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn with_bearer(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
