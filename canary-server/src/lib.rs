// Copyright 2026 Canary Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod api;
pub mod error;
pub mod rate_limit;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use canary_core::AppConfig;
use canary_judge::{LlmJudge, NullJudge, OpenAiJudge};
use canary_pipeline::AnalyzePipeline;
use canary_release::{webhook::WebhookNotifier, ReleaseController};
use canary_store::{CanaryStore, PostgresStore};
use rate_limit::TokenBucket;
use state::AppState;

/// Builds the full router over an already-constructed `AppState`. Split out
/// from `run_server` so integration tests can exercise the HTTP surface
/// against an `InMemoryStore` without binding a socket or touching Postgres.
pub fn build_router(state: AppState) -> Router {
    let bucket = Arc::new(TokenBucket::new(
        state.config.rate_limit_requests,
        Duration::from_secs(state.config.rate_limit_window_secs),
    ));

    Router::new()
        .route("/health", get(api::health::health_check))
        .route("/analyze", post(api::analyze::analyze))
        .route("/optimize", get(api::optimize::optimize))
        .route("/feedback", post(api::feedback::feedback))
        .route("/history", get(api::history::history))
        .route("/report", get(api::report::report))
        .route("/prompts/:id/release", post(api::release::release))
        .route("/prompts/:id/rollback", post(api::rollback::rollback))
        .route("/prompts/:id/status", get(api::status::status))
        .route("/prompts/:id/check", post(api::check::check))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(bucket, rate_limit::rate_limit_middleware))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: AppConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canary_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;
    tracing::info!(listen_addr = %config.http_listen_addr, "starting canary release engine");

    let pg = PostgresStore::connect(&config.database_url).await?;
    pg.migrate().await?;
    let store: Arc<dyn CanaryStore> = Arc::new(pg);

    let judge: Arc<dyn LlmJudge> = match config.openai_api_key.clone() {
        Some(key) if !key.is_empty() => Arc::new(OpenAiJudge::new(
            key,
            config.judge_model.clone(),
            Duration::from_millis(config.judge_timeout_ms),
        )),
        _ => {
            tracing::info!("OPENAI_API_KEY not set, judge always returns its fallback");
            Arc::new(NullJudge)
        }
    };

    let webhook = WebhookNotifier::new(
        config.webhook_url.clone(),
        Duration::from_secs(config.webhook_timeout_secs),
    );

    let release = Arc::new(ReleaseController::new(
        store.clone(),
        webhook,
        config.canary_min_samples,
        config.canary_threshold,
        config.default_window_days,
    ));
    let pipeline = Arc::new(AnalyzePipeline::new(store.clone(), judge.clone()));

    let state = AppState {
        store,
        judge,
        pipeline,
        release,
        config: Arc::new(config.clone()),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_listen_addr).await?;
    tracing::info!("listening on http://{}", config.http_listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
