//! Common test utilities for integration tests.
//!
//! The router runs against the in-memory backend, with artifacts written to
//! a temporary directory that lives as long as the returned [`TestApp`].

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use checkin_api::app::{create_app, Stores};
use checkin_api::config::{
    ArtifactsConfig, CodesConfig, Config, DatabaseConfig, LimitsConfig, LoggingConfig,
    SecurityConfig, ServerConfig, StorageBackend, StorageConfig,
};
use domain::models::EntryPolicy;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub artifacts_dir: TempDir,
}

/// Test configuration with in-memory storage.
pub fn test_config(artifacts_dir: &std::path::Path, policy: EntryPolicy) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_size: 10 * 1024 * 1024,
        },
        database: DatabaseConfig::default(),
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            data_file: Default::default(),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig::default(),
        limits: LimitsConfig::default(),
        codes: CodesConfig {
            entry_policy: policy,
            ..CodesConfig::default()
        },
        artifacts: ArtifactsConfig {
            dir: artifacts_dir.to_path_buf(),
        },
    }
}

pub fn create_test_app_with_policy(policy: EntryPolicy) -> TestApp {
    let artifacts_dir = TempDir::new().expect("Failed to create artifacts dir");
    let config = test_config(artifacts_dir.path(), policy);
    let router = create_app(config, Stores::in_memory()).expect("Failed to build app");
    TestApp {
        router,
        artifacts_dir,
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_policy(EntryPolicy::SingleEntry)
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router
        .clone()
        .oneshot(request)
        .await
        .expect("Request failed")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}

/// Issues an invite and returns the response JSON.
pub async fn issue(app: &TestApp, name: &str) -> Value {
    let response = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/invites",
            serde_json::json!({ "invitee_name": name }),
        ),
    )
    .await;
    assert_eq!(response.status(), 201);
    body_json(response).await
}

/// Submits an image for scanning and returns the response JSON.
pub async fn scan(app: &TestApp, image_data: &str, source: &str) -> Value {
    let response = send(
        app,
        json_request(
            Method::POST,
            "/api/v1/scan",
            serde_json::json!({ "image_data": image_data, "source": source }),
        ),
    )
    .await;
    assert_eq!(response.status(), 200);
    body_json(response).await
}

pub async fn stats(app: &TestApp) -> Value {
    let response = send(app, get_request("/api/v1/stats")).await;
    assert_eq!(response.status(), 200);
    body_json(response).await
}

/// Builds the app against PostgreSQL when `TEST_DATABASE_URL` is set.
///
/// Returns `None` otherwise so database tests are skipped on machines
/// without a server.
pub async fn create_postgres_test_app() -> Option<TestApp> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let artifacts_dir = TempDir::new().expect("Failed to create artifacts dir");
    let mut config = test_config(artifacts_dir.path(), EntryPolicy::SingleEntry);
    config.storage.backend = StorageBackend::Postgres;
    config.database.url = url;

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config)
        .await
        .expect("Failed to connect to test database");
    persistence::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let router = create_app(config, Stores::postgres(pool)).expect("Failed to build app");
    Some(TestApp {
        router,
        artifacts_dir,
    })
}
