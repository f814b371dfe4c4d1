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

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use canary_core::AppConfig;
use canary_judge::NullJudge;
use canary_pipeline::AnalyzePipeline;
use canary_release::{webhook::WebhookNotifier, ReleaseController};
use canary_server::{build_router, state::AppState};
use canary_store::{CanaryStore, InMemoryStore};

fn test_config() -> AppConfig {
    AppConfig {
        canary_min_samples: 3,
        canary_threshold: 0.55,
        rate_limit_requests: 1_000,
        ..Default::default()
    }
}

fn app_with_store(store: Arc<dyn CanaryStore>, config: AppConfig) -> Router {
    let judge = Arc::new(NullJudge);
    let release = Arc::new(ReleaseController::new(
        store.clone(),
        WebhookNotifier::disabled(),
        config.canary_min_samples,
        config.canary_threshold,
        config.default_window_days,
    ));
    let pipeline = Arc::new(AnalyzePipeline::new(store.clone(), judge.clone()));

    build_router(AppState {
        store,
        judge,
        pipeline,
        release,
        config: Arc::new(config),
    })
}

fn test_app() -> (Router, Arc<dyn CanaryStore>) {
    let store: Arc<dyn CanaryStore> = Arc::new(InMemoryStore::new());
    (app_with_store(store.clone(), test_config()), store)
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(b) => Body::from(b.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn health_check_reports_healthy() {
    let (app, _store) = test_app();
    let (status, body) = send(app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn analyze_rejects_missing_prompt_and_prompt_id() {
    let (app, _store) = test_app();
    let (status, _body) = send(app, "POST", "/analyze", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn analyze_scores_a_fresh_prompt() {
    let (app, _store) = test_app();
    let (status, body) = send(
        app,
        "POST",
        "/analyze",
        Some(json!({"prompt": "Summarize the article in 3 bullets."})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_canary"], false);
    assert!(body["overall"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn optimize_requires_a_known_prompt() {
    let (app, _store) = test_app();
    let (status, _body) = send(app, "GET", "/optimize?prompt_id=999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn optimize_stores_a_suggestion() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Write a haiku.").await.unwrap();

    let (status, body) = send(
        app,
        "GET",
        &format!("/optimize?prompt_id={}", prompt.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["suggested_text"].as_str().unwrap().contains("Write a haiku."));
    assert_eq!(
        body["rationale"],
        "Improve clarity; add constraints and success criteria."
    );
}

#[tokio::test]
async fn optimize_sources_notes_from_the_latest_evaluation() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Write a haiku.").await.unwrap();
    store
        .insert_evaluation(canary_store::NewEvaluation {
            prompt_id: prompt.id,
            response_id: None,
            length_score: 0.5,
            clarity_score: 0.5,
            toxicity_score: 0.5,
            overall_score: 0.5,
            notes: "Add a seasonal reference.".to_string(),
            is_canary: false,
        })
        .await
        .unwrap();

    let (status, body) = send(
        app,
        "GET",
        &format!("/optimize?prompt_id={}", prompt.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rationale"], "Add a seasonal reference.");
}

#[tokio::test]
async fn feedback_rejects_out_of_range_rating() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Write a haiku.").await.unwrap();

    let (status, _body) = send(
        app,
        "POST",
        "/feedback",
        Some(json!({"prompt_id": prompt.id.0, "rating": 9})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn feedback_rejects_response_from_a_different_prompt() {
    let (app, store) = test_app();
    let prompt_a = store.insert_prompt("Prompt A").await.unwrap();
    let prompt_b = store.insert_prompt("Prompt B").await.unwrap();
    let response = store.insert_response(prompt_b.id, "reply", "gpt-4o-mini").await.unwrap();

    let (status, _body) = send(
        app,
        "POST",
        "/feedback",
        Some(json!({
            "prompt_id": prompt_a.id.0,
            "response_id": response.id.0,
            "rating": 4,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feedback_accepts_a_matching_response() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Prompt A").await.unwrap();
    let response = store.insert_response(prompt.id, "reply", "gpt-4o-mini").await.unwrap();

    let (status, body) = send(
        app,
        "POST",
        "/feedback",
        Some(json!({
            "prompt_id": prompt.id.0,
            "response_id": response.id.0,
            "rating": 5,
            "comment": "great",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 5);
}

#[tokio::test]
async fn history_returns_prompt_text_and_suggestions() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Write a limerick.").await.unwrap();
    store.insert_suggestion(prompt.id, "Write a sharper limerick.", "clarity").await.unwrap();

    let (status, body) = send(
        app,
        "GET",
        &format!("/history?prompt_id={}", prompt.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompt_text"], "Write a limerick.");
    assert_eq!(body["suggestions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn release_then_status_reports_the_canary() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
    store
        .insert_suggestion(prompt.id, "Summarize the article in 3 bullets.", "clarity")
        .await
        .unwrap();

    let (status, body) = send(
        app.clone(),
        "POST",
        &format!("/prompts/{}/release", prompt.id),
        Some(json!({"canary_percent": 25})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canary_percent"], 25);

    let (status, body) = send(
        app,
        "GET",
        &format!("/prompts/{}/status", prompt.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canary_percent"], 25);
    assert!(body["canary_version_id"].is_number());
}

#[tokio::test]
async fn release_without_a_suggestion_is_rejected() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Summarize the article.").await.unwrap();

    let (status, _body) = send(
        app,
        "POST",
        &format!("/prompts/{}/release", prompt.id),
        Some(json!({"canary_percent": 25})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rollback_without_a_canary_is_rejected() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
    store.bootstrap_release(&prompt).await.unwrap();

    let (status, body) = send(
        app,
        "POST",
        &format!("/prompts/{}/rollback", prompt.id),
        Some(json!({})),
    )
    .await;
    assert_eq!(body["detail"], "no canary to rollback");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn manual_rollback_clears_the_canary() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
    store
        .insert_suggestion(prompt.id, "Summarize the article in 3 bullets.", "clarity")
        .await
        .unwrap();
    send(
        app.clone(),
        "POST",
        &format!("/prompts/{}/release", prompt.id),
        Some(json!({"canary_percent": 50})),
    )
    .await;

    let (status, body) = send(
        app.clone(),
        "POST",
        &format!("/prompts/{}/rollback", prompt.id),
        Some(json!({"reason": "bad vibes"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reason"], "bad vibes");

    let (_status, body) = send(app, "GET", &format!("/prompts/{}/status", prompt.id), None).await;
    assert_eq!(body["canary_percent"], 0);
    assert!(body["canary_version_id"].is_null());
}

/// End-to-end auto-rollback: 30 canary evaluations averaging 0.30, 30 active
/// evaluations averaging 0.80, default threshold 0.55 puts the cutoff at
/// 0.44 — canary falls well below it and /prompts/{id}/check rolls back.
#[tokio::test]
async fn check_auto_rolls_back_a_failing_canary() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
    let (release, _active) = store.bootstrap_release(&prompt).await.unwrap();
    let suggestion = store
        .insert_suggestion(prompt.id, "Summarize the article in 3 bullets.", "clarity")
        .await
        .unwrap();
    store.release_canary(&release, &suggestion, 50).await.unwrap();

    for _ in 0..30 {
        store
            .insert_evaluation(canary_store::NewEvaluation {
                prompt_id: prompt.id,
                response_id: None,
                length_score: 0.3,
                clarity_score: 0.3,
                toxicity_score: 0.3,
                overall_score: 0.30,
                notes: String::new(),
                is_canary: true,
            })
            .await
            .unwrap();
    }
    for _ in 0..30 {
        store
            .insert_evaluation(canary_store::NewEvaluation {
                prompt_id: prompt.id,
                response_id: None,
                length_score: 0.8,
                clarity_score: 0.8,
                toxicity_score: 0.8,
                overall_score: 0.80,
                notes: String::new(),
                is_canary: false,
            })
            .await
            .unwrap();
    }

    let (status, body) = send(
        app.clone(),
        "POST",
        &format!("/prompts/{}/check", prompt.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rolled_back"], true);

    let (_status, body) = send(app, "GET", &format!("/prompts/{}/status", prompt.id), None).await;
    assert_eq!(body["canary_percent"], 0);
}

#[tokio::test]
async fn check_reports_insufficient_samples_with_counts() {
    let (app, store) = test_app();
    let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
    let (release, _active) = store.bootstrap_release(&prompt).await.unwrap();
    let suggestion = store
        .insert_suggestion(prompt.id, "Summarize the article in 3 bullets.", "clarity")
        .await
        .unwrap();
    store.release_canary(&release, &suggestion, 50).await.unwrap();

    for _ in 0..2 {
        store
            .insert_evaluation(canary_store::NewEvaluation {
                prompt_id: prompt.id,
                response_id: None,
                length_score: 0.3,
                clarity_score: 0.3,
                toxicity_score: 0.3,
                overall_score: 0.30,
                notes: String::new(),
                is_canary: true,
            })
            .await
            .unwrap();
    }

    let (status, body) = send(app, "POST", &format!("/prompts/{}/check", prompt.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rolled_back"], false);
    assert_eq!(body["reason"], "insufficient samples: 2/3");
}

#[tokio::test]
async fn report_defaults_to_the_configured_window() {
    let (app, store) = test_app();
    store.insert_prompt("Summarize the article.").await.unwrap();

    let (status, body) = send(app, "GET", "/report", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().is_some());
}

#[tokio::test]
async fn rate_limit_middleware_never_rejects_a_burst() {
    let store: Arc<dyn CanaryStore> = Arc::new(InMemoryStore::new());
    let mut config = test_config();
    config.rate_limit_requests = 1;
    config.rate_limit_window_secs = 3600;
    let app = app_with_store(store, config);

    for _ in 0..5 {
        let (status, _body) = send(app.clone(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
