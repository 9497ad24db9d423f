#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use mathquest_api::{
    config::Config,
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    services::AppState,
    store::MemoryProgressStore,
    utils::time::ManualClock,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: MemoryProgressStore,
    pub clock: Arc<ManualClock>,
    jwt: JwtService,
}

/// Router over an in-memory store seeded from `config/catalog.json`, with the
/// clock pinned to 2024-05-10 10:00 UTC.
pub fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = MemoryProgressStore::from_catalog_file(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/config/catalog.json"
    ))
    .expect("Failed to load test catalog");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 10, 10, 0, 0).unwrap(),
    ));

    let state = AppState::with_store(
        Config::in_memory(JWT_SECRET),
        Arc::new(store.clone()),
        clock.clone(),
    );

    TestApp {
        router: create_router(Arc::new(state)),
        store,
        clock,
        jwt: JwtService::new(JWT_SECRET),
    }
}

impl TestApp {
    pub fn token(&self, user_id: &str) -> String {
        self.jwt
            .generate_token(&JwtClaims::for_user(user_id, 3600))
            .expect("Failed to sign test token")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: &Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        self.send(
            builder
                .body(Body::from(serde_json::to_string(body).unwrap()))
                .unwrap(),
        )
        .await
    }

    pub async fn submit(
        &self,
        token: &str,
        lesson_id: &str,
        problem_id: &str,
        attempt_id: &str,
        answer: &str,
    ) -> (StatusCode, Value) {
        self.post_json(
            &format!("/api/v1/lessons/{}/submit", lesson_id),
            Some(token),
            &serde_json::json!({
                "problemId": problem_id,
                "attemptId": attempt_id,
                "answer": answer,
            }),
        )
        .await
    }
}
