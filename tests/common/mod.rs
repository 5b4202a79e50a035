#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use shopfront_api::config::AppConfig;
use shopfront_api::database::{MemoryStore, Store};
use shopfront_api::media::LocalMediaStore;
use shopfront_api::{app, AppState};

pub const ADMIN_EMAIL: &str = "admin@shop.test";
pub const ADMIN_PASSWORD: &str = "Admin1234";

/// In-process application over a fresh memory store
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub media_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn problems(&self) -> Vec<String> {
        self.body["problems"]
            .as_array()
            .map(|a| a.iter().filter_map(|p| p.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

pub fn test_config(media_dir: &TempDir) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("STORE_BACKEND", "memory".to_string()),
        ("JWT_SECRET", "integration-test-secret".to_string()),
        ("SECURITY_BCRYPT_COST", "4".to_string()),
        ("MEDIA_DIR", media_dir.path().display().to_string()),
        ("MEDIA_PUBLIC_URL", "http://localhost:5000/media".to_string()),
        ("MEDIA_MAX_UPLOAD_BYTES", "4096".to_string()),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).cloned())
}

impl TestApp {
    pub fn spawn() -> Result<Self> {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn Store>) -> Result<Self> {
        let media_dir = tempfile::tempdir().context("creating media dir")?;
        let config = test_config(&media_dir);
        let media = Arc::new(LocalMediaStore::new(&config.media));
        let state = AppState::new(config, store, media)?;
        Ok(Self { router: app(state.clone()), state, media_dir })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {:?}", bytes))?
        };
        Ok(TestResponse { status, body })
    }

    pub async fn request(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<TestResponse> {
        self.request(Method::DELETE, path, token, None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let res = self.post("/api/auth/login", None, json!({"email": email, "password": password})).await?;
        anyhow::ensure!(res.status == StatusCode::OK, "login failed: {}", res.body);
        res.data()["token"].as_str().map(str::to_string).context("token missing")
    }

    /// Seed the administrator account and return its token
    pub async fn admin_token(&self) -> Result<String> {
        self.state
            .accounts
            .create_admin("admin", ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .map_err(|e| anyhow::anyhow!("seeding admin: {}", e))?;
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Register a standard account and return its token
    pub async fn user_token(&self, username: &str) -> Result<String> {
        let email = format!("{}@shop.test", username);
        let res = self
            .post(
                "/api/auth/register",
                None,
                json!({"username": username, "email": email, "password": "User1234"}),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "register failed: {}", res.body);
        self.login(&email, "User1234").await
    }
}

/// Hand-built multipart body with text fields and one file part
pub fn multipart_request(
    method: Method,
    path: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Result<Request<Body>> {
    let boundary = "shopfront-test-boundary";
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    if let Some((name, file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Ok(Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))?)
}
