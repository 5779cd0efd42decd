//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext wiring a QuizService to an in-memory results sink
//! - Helpers for driving a session through the HTTP API

#![allow(dead_code)]

pub mod fixtures;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use serde_json::Value;

use kobun_core::{QuestionBank, QuizConfig, ResultPayload};
use kobun_quiz_server::services::quiz::QuizService;
use kobun_quiz_server::services::sink::{ResultsSink, SinkError};
use kobun_quiz_server::{router, AppState};

/// Idle timeout of every test service.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Sink that records payloads instead of posting them.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<ResultPayload>>,
    offline: AtomicBool,
    slow_failure: Mutex<Option<Duration>>,
}

impl RecordingSink {
    /// Make the next delivery fail after `delay`.
    pub fn fail_next_after(&self, delay: Duration) {
        *self.slow_failure.lock().unwrap() = Some(delay);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<ResultPayload> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultsSink for RecordingSink {
    async fn deliver(&self, payload: &ResultPayload) -> Result<(), SinkError> {
        let slow_failure = self.slow_failure.lock().unwrap().take();
        if let Some(delay) = slow_failure {
            tokio::time::sleep(delay).await;
            return Err(SinkError::Network("timed out".to_string()));
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(SinkError::Network("offline".to_string()));
        }
        self.delivered.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Test context containing the quiz service, its sink and the router.
pub struct TestContext {
    pub quiz: QuizService,
    pub sink: Arc<RecordingSink>,
    app: Router,
}

impl TestContext {
    /// Create a context over `csv` with default quiz settings.
    pub fn new(csv: &str) -> Self {
        Self::with_config(csv, QuizConfig::default())
    }

    pub fn with_config(csv: &str, config: QuizConfig) -> Self {
        let bank = QuestionBank::from_csv(csv, config.skip_header);
        let sink = Arc::new(RecordingSink::default());
        let quiz = QuizService::new(
            Arc::new(bank),
            config,
            "古文単語".to_string(),
            sink.clone(),
            IDLE_TIMEOUT,
        );
        let app = router(AppState { quiz: quiz.clone() });
        Self { quiz, sink, app }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }
}

/// Start a session and return its id and view.
pub async fn start_session(server: &TestServer, name: &str) -> (String, Value) {
    let response = server
        .post("/api/sessions")
        .json(&fixtures::start_request(name, None))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    let id = body["session_id"].as_str().unwrap().to_string();
    (id, body["session"].clone())
}

/// Answer the current question correctly or not, then advance.
pub async fn answer_and_advance(server: &TestServer, id: &str, correct: bool) -> Value {
    let view: Value = server.get(&format!("/api/sessions/{id}")).await.json();
    let prompt = view["question"]["prompt"].as_str().unwrap();
    let answer = if correct {
        fixtures::answer_for(prompt)
    } else {
        fixtures::WRONG_ANSWER.to_string()
    };

    server
        .post(&format!("/api/sessions/{id}/answer"))
        .json(&fixtures::answer_request(&answer))
        .await
        .assert_status_ok();

    let response = server.post(&format!("/api/sessions/{id}/advance")).await;
    response.assert_status_ok();
    response.json()
}

/// Poll until the delivery status leaves `sending`.
pub async fn wait_for_delivery(server: &TestServer, id: &str) -> Value {
    for _ in 0..100 {
        let view: Value = server.get(&format!("/api/sessions/{id}")).await.json();
        if view["delivery"]["status"] != "sending" {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("delivery for session {id} did not finish");
}
