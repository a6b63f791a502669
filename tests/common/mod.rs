#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use fonokids::api::{self, AppState};
use fonokids::clock::{Clock, ManualClock};
use fonokids::config::Config;
use fonokids::notifier::{Notifier, NotifyError};
use fonokids::state::SharedState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl SentMessage {
    /// The six-digit code rendered in the reset email.
    pub fn code(&self) -> String {
        let end = self.body.find("</h2>").expect("code heading");
        self.body[end - 6..end].to_string()
    }
}

/// Records every message and can be switched into a failing mode.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> SentMessage {
        self.sent().last().cloned().expect("no message sent")
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: html_body.to_string(),
        });

        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    db_path: PathBuf,
}

pub fn test_config(db_path: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.database.url = format!("sqlite:{}", db_path.display());
    config.security.jwt_secret = Some(TEST_SECRET.to_string());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("fonokids-test-{}.db", uuid::Uuid::new_v4()))
}

pub async fn spawn_app() -> TestApp {
    let db_path = temp_db_path();
    let config = test_config(&db_path);

    let notifier = Arc::new(RecordingNotifier::default());
    let start = Utc::now()
        .duration_trunc(TimeDelta::seconds(1))
        .expect("truncate start time");
    let clock = Arc::new(ManualClock::new(start));

    let shared = SharedState::with_components(config, notifier.clone(), clock.clone())
        .await
        .expect("Failed to create shared state");
    let state = api::create_app_state(Arc::new(shared), None);
    let router = api::router(state.clone());

    TestApp {
        router,
        state,
        notifier,
        clock,
        db_path,
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let path = self.db_path.display().to_string();
        for suffix in ["", "-wal", "-shm", "-journal"] {
            std::fs::remove_file(format!("{path}{suffix}")).ok();
        }
    }
}

impl TestApp {
    pub fn clock_now_utc(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock_now(&self) -> String {
        self.clock_now_utc().to_rfc3339()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// POST with an arbitrary body and optional content type.
    pub async fn post_raw(
        &self,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::POST).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, value)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, None, Some(body)).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    /// Creates an account and returns its id.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/auth/create-user",
                json!({
                    "username": username,
                    "email": email,
                    "password": password,
                    "full_name": format!("{username} Test"),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"]["id"].as_i64().unwrap()
    }

    pub async fn login(&self, login: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/login",
            json!({ "username": login, "password": password }),
        )
        .await
    }

    /// Logs in and returns the session token.
    pub async fn token(&self, login: &str, password: &str) -> String {
        let (status, body) = self.login(login, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Requests a reset code and returns the code that was emailed.
    pub async fn request_code(&self, email: &str) -> String {
        let (status, body) = self
            .post("/api/auth/forgot-password", json!({ "email": email }))
            .await;
        assert_eq!(status, StatusCode::OK, "forgot-password failed: {body}");
        self.notifier.last().code()
    }

    pub async fn verify_code(&self, email: &str, code: &str) -> StatusCode {
        self.post(
            "/api/auth/verify-reset-code",
            json!({ "email": email, "code": code }),
        )
        .await
        .0
    }

    pub async fn reset(&self, email: &str, code: &str, new_password: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/reset-password",
            json!({ "email": email, "code": code, "new_password": new_password }),
        )
        .await
    }
}
