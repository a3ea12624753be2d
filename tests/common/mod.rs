#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use finance_tracker_api::app::{app, AppState};
use finance_tracker_api::auth::{generate_jwt, Claims, JwtVerifier};
use finance_tracker_api::config::AppConfig;
use finance_tracker_api::database::MemoryStore;

pub const TEST_SECRET: &str = "integration-test-secret";

/// The full router over an in-memory store, driven in-process
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub config: AppConfig,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let config = AppConfig::from_lookup(|key| match key {
            "APP_ENV" => Some("development".to_string()),
            "DATABASE_BACKEND" => Some("memory".to_string()),
            "SECURITY_JWT_SECRET" => Some(TEST_SECRET.to_string()),
            "API_ENABLE_REQUEST_LOGGING" => Some("true".to_string()),
            _ => None,
        });

        let store = Arc::new(MemoryStore::new());
        let verifier = JwtVerifier::from_config(&config.security).context("failed to build verifier")?;
        let state = AppState {
            store: store.clone(),
            verifier: Arc::new(verifier),
        };
        let router = app(state, &config);

        Ok(Self { router, store, config })
    }

    /// A valid bearer token for `subject`
    pub fn token(&self, subject: &str) -> Result<String> {
        Ok(generate_jwt(&self.config.security, Claims::new(subject, 1)?)?)
    }

    /// A correctly signed token whose expiry has passed
    pub fn expired_token(&self, subject: &str) -> Result<String> {
        let mut claims = Claims::new(subject, 1)?;
        claims.iat -= 3 * 3600;
        claims.exp -= 3 * 3600;
        Ok(generate_jwt(&self.config.security, claims)?)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<&Value>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: &Value) -> Result<TestResponse> {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: &Value) -> Result<TestResponse> {
        self.call(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// POST and return the new id, failing unless the create succeeded
    pub async fn create(&self, kind: &str, token: &str, body: &Value) -> Result<String> {
        let res = self.post(&format!("/v1/{}", kind), token, body).await?;
        anyhow::ensure!(res.status == StatusCode::OK, "create {} failed: {} {}", kind, res.status, res.body);
        res.body
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .context("create response missing id")
    }
}
