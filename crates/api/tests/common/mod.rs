//! Shared harness for API integration tests.
//!
//! Builds the real router over an in-memory consumption store, a stub plan
//! generator and stub verifiers, so gate tests need no database.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use liftlog_core::error::StoreError;
use liftlog_core::platform::Platform;
use liftlog_core::rate_limit::{Bucket, ConsumptionStore, RateLimitConfig, RateLimiter, WindowUsage};
use liftlog_core::types::Timestamp;
use liftlog_core::verification::VerificationResult;
use liftlog_verification::strategy::VerificationStrategy;
use liftlog_verification::web::{WebConfig, WebVerifier};
use liftlog_verification::PurchaseVerifier;
use serde_json::{json, Value};
use tower::ServiceExt;

use liftlog_api::config::ServerConfig;
use liftlog_api::metrics::RequestMetrics;
use liftlog_api::planner::{PlanError, PlanGenerator, PlanKind};
use liftlog_api::router::build_app_router;
use liftlog_api::state::AppState;

pub const WEB_SECRET: &str = "api-test-web-secret";

/// Token the stub mobile strategies accept.
pub const GOOD_MOBILE_TOKEN: &str = "premium_monthly:good";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(rate_limit: RateLimitConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_max_connections: 5,
        plan_generator_url: "http://127.0.0.1:1".to_string(),
        rate_limit,
    }
}

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

/// Mobile strategy accepting only [`GOOD_MOBILE_TOKEN`].
pub struct StubMobileVerifier(pub Platform);

#[async_trait]
impl VerificationStrategy for StubMobileVerifier {
    fn platform(&self) -> Platform {
        self.0
    }

    async fn verify(&self, token: &str) -> VerificationResult {
        if token == GOOD_MOBILE_TOKEN {
            VerificationResult::valid(self.0, Some("acct-1".into()))
        } else {
            VerificationResult::invalid(self.0, "Subscription is not active")
        }
    }
}

/// Plan generator that echoes its input, or fails on demand.
#[derive(Default)]
pub struct StubPlanGenerator {
    calls: AtomicUsize,
    fail: bool,
}

impl StubPlanGenerator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanGenerator for StubPlanGenerator {
    async fn generate(&self, kind: PlanKind, request: Value) -> Result<Value, PlanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PlanError::HttpStatus {
                status: 500,
                body: "model overloaded".into(),
            });
        }
        Ok(json!({ "kind": kind.path(), "request": request }))
    }
}

/// Store whose every call fails as unreachable.
pub struct UnavailableStore;

#[async_trait]
impl ConsumptionStore for UnavailableStore {
    async fn try_consume(
        &self,
        _bucket: &Bucket,
        _window_start: Timestamp,
        _now: Timestamp,
        _allowed: i64,
    ) -> Result<WindowUsage, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

pub fn test_verifier() -> PurchaseVerifier {
    PurchaseVerifier::new()
        .register(Arc::new(WebVerifier::new(WebConfig {
            secret_key: Some(WEB_SECRET.into()),
        })))
        .register(Arc::new(StubMobileVerifier(Platform::Google)))
        .register(Arc::new(StubMobileVerifier(Platform::Apple)))
}

/// Build the full application router from its parts.
pub fn build_test_app(
    rate_limit: RateLimitConfig,
    store: Arc<dyn ConsumptionStore>,
    plan_generator: Arc<dyn PlanGenerator>,
) -> Router {
    let config = test_config(rate_limit);
    let state = AppState {
        config: Arc::new(config.clone()),
        verifier: Arc::new(test_verifier()),
        rate_limiter: Arc::new(RateLimiter::new(store, rate_limit)),
        plan_generator,
        metrics: RequestMetrics::new(),
    };
    build_app_router(state, &config)
}

/// A web token signed with [`WEB_SECRET`].
pub fn web_token(subject_id: &str) -> String {
    liftlog_core::web_token::issue(WEB_SECRET, subject_id, "1700000000")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a JSON body, optionally with an `Authorization` header.
pub async fn post_json(app: Router, uri: &str, authorization: Option<&str>, body: &Value) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
