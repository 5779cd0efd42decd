pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::services::quiz::QuizService;
use crate::services::sink::HttpSink;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub quiz: QuizService,
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    tracing::info!("Loading question bank...");
    let bank = config.load_bank()?;
    tracing::info!("Loaded {} questions", bank.len());

    if config.sink_url.is_none() {
        tracing::warn!("KOBUN_SINK_URL is not set; result submissions will fail");
    }
    let sink = HttpSink::new(
        config.sink_url.clone(),
        config.quiz.sink_mode,
        config.sink_timeout(),
    )?;

    let state = AppState {
        quiz: QuizService::new(
            Arc::new(bank),
            config.quiz.clone(),
            config.app_name.clone(),
            Arc::new(sink),
            config.session_idle_timeout(),
        ),
    };

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr = config.addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/bank", get(routes::bank::info))
        .route("/api/sessions", post(routes::sessions::start))
        .route(
            "/api/sessions/:id",
            get(routes::sessions::get).delete(routes::sessions::end),
        )
        .route("/api/sessions/:id/draft", put(routes::sessions::draft))
        .route("/api/sessions/:id/answer", post(routes::sessions::answer))
        .route("/api/sessions/:id/advance", post(routes::sessions::advance))
        .route("/api/sessions/:id/result", post(routes::sessions::show_result))
        .route("/api/sessions/:id/retry", post(routes::sessions::retry_all))
        .route(
            "/api/sessions/:id/retry-missed",
            post(routes::sessions::retry_missed),
        )
        .route("/api/sessions/:id/submit", post(routes::results::submit))
        .route(
            "/api/sessions/:id/submit/resend",
            post(routes::results::resend),
        )
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
