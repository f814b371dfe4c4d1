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

//! The heart of the engine: mints canary versions from
//! suggestions, runs the windowed health check, and performs manual or
//! automatic rollback with an audit event and best-effort webhook.

pub mod webhook;

use std::sync::Arc;

use serde::Serialize;

use canary_core::{CanaryError, PromptId, Result, SuggestionId, VersionId};
use canary_store::CanaryStore;
use webhook::WebhookNotifier;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseStatus {
    pub prompt_id: PromptId,
    pub active_version_id: VersionId,
    pub canary_version_id: VersionId,
    pub canary_percent: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub prompt_id: PromptId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub rolled_back: bool,
    pub reason: String,
    pub canary_avg: Option<f64>,
    pub active_avg: Option<f64>,
}

pub struct ReleaseController {
    store: Arc<dyn CanaryStore>,
    webhook: WebhookNotifier,
    min_samples: i64,
    threshold: f64,
    window_days: i64,
}

impl ReleaseController {
    pub fn new(
        store: Arc<dyn CanaryStore>,
        webhook: WebhookNotifier,
        min_samples: i64,
        threshold: f64,
        window_days: i64,
    ) -> Self {
        Self {
            store,
            webhook,
            min_samples,
            threshold,
            window_days,
        }
    }

    /// `Release(prompt_id, suggestion_id?, canary_percent)`. Schedules the
    /// asynchronous canary health check as a detached task; its outcome
    /// never blocks or fails this call.
    pub async fn release(
        &self,
        prompt_id: PromptId,
        suggestion_id: Option<SuggestionId>,
        canary_percent: i32,
    ) -> Result<ReleaseStatus> {
        let prompt = self
            .store
            .get_prompt(prompt_id)
            .await?
            .ok_or_else(|| CanaryError::NotFound(format!("prompt {prompt_id}")))?;

        let suggestion = match suggestion_id {
            Some(id) => {
                let suggestion = self
                    .store
                    .get_suggestion(id)
                    .await?
                    .ok_or_else(|| CanaryError::NotFound(format!("suggestion {id}")))?;
                if suggestion.prompt_id != prompt_id {
                    return Err(CanaryError::InvalidArgument(
                        "suggestion does not belong to this prompt".to_string(),
                    ));
                }
                suggestion
            }
            None => self
                .store
                .latest_suggestion(prompt_id)
                .await?
                .ok_or_else(|| CanaryError::InvalidArgument("no suggestions".to_string()))?,
        };

        let (release, _active) = self.store.bootstrap_release(&prompt).await?;

        let updated = self.with_conflict_retry(|| {
            let release = release.clone();
            let suggestion = suggestion.clone();
            async move { self.store.release_canary(&release, &suggestion, canary_percent).await }
        }).await?;

        let canary_version_id = updated
            .canary_version_id
            .expect("release_canary always sets canary_version_id");

        let prompt_id_for_check = prompt_id;
        let controller = self.clone_for_task();
        tokio::spawn(async move {
            if let Err(err) = controller.check(prompt_id_for_check, None, None, None).await {
                tracing::warn!(error = %err, prompt_id = %prompt_id_for_check, "scheduled canary check failed");
            }
        });

        Ok(ReleaseStatus {
            prompt_id,
            active_version_id: updated.active_version_id,
            canary_version_id,
            canary_percent: updated.canary_percent,
        })
    }

    /// `Rollback(prompt_id, reason?)`. Never emits a webhook — manual
    /// rollback is already observable to its caller.
    pub async fn rollback(&self, prompt_id: PromptId, reason: Option<String>) -> Result<Ack> {
        let release = self
            .store
            .get_release(prompt_id)
            .await?
            .ok_or_else(|| CanaryError::NotFound(format!("release for prompt {prompt_id}")))?;

        if release.canary_version_id.is_none() {
            return Err(CanaryError::InvalidArgument("no canary to rollback".to_string()));
        }

        let reason = reason.unwrap_or_else(|| "manual rollback".to_string());
        self.with_conflict_retry(|| {
            let release = release.clone();
            let reason = reason.clone();
            async move { self.store.rollback_canary(&release, &reason).await }
        })
        .await?;

        Ok(Ack { prompt_id, reason })
    }

    /// `Check(prompt_id, min_samples?, threshold?, window_days?)` — the
    /// automatic-rollback decision algorithm.
    pub async fn check(
        &self,
        prompt_id: PromptId,
        min_samples: Option<i64>,
        threshold: Option<f64>,
        window_days: Option<i64>,
    ) -> Result<CheckResult> {
        let min_samples = min_samples.unwrap_or(self.min_samples);
        let threshold = threshold.unwrap_or(self.threshold);
        let window_days = window_days.unwrap_or(self.window_days);

        let release = self
            .store
            .get_release(prompt_id)
            .await?
            .ok_or_else(|| CanaryError::NotFound(format!("release for prompt {prompt_id}")))?;

        if !release.has_live_canary() {
            return Ok(CheckResult {
                rolled_back: false,
                reason: "no active canary".to_string(),
                canary_avg: None,
                active_avg: None,
            });
        }

        let aggregate = self.store.aggregate_evaluations(prompt_id, window_days).await?;

        if aggregate.n_canary < min_samples {
            return Ok(CheckResult {
                rolled_back: false,
                reason: format!("insufficient samples: {}/{}", aggregate.n_canary, min_samples),
                canary_avg: Some(aggregate.canary_avg),
                active_avg: Some(aggregate.active_avg),
            });
        }

        let cutoff = aggregate.active_avg * threshold;
        if aggregate.canary_avg + EPSILON < cutoff {
            let reason = format!(
                "auto-rollback: canary_avg {:.3} < active_avg {:.3} × threshold {:.2}",
                aggregate.canary_avg, aggregate.active_avg, threshold
            );
            self.with_conflict_retry(|| {
                let release = release.clone();
                let reason = reason.clone();
                async move { self.store.rollback_canary(&release, &reason).await }
            })
            .await?;

            self.webhook.notify_rollback(
                prompt_id,
                reason.clone(),
                aggregate.canary_avg,
                aggregate.active_avg,
            );

            return Ok(CheckResult {
                rolled_back: true,
                reason,
                canary_avg: Some(aggregate.canary_avg),
                active_avg: Some(aggregate.active_avg),
            });
        }

        Ok(CheckResult {
            rolled_back: false,
            reason: "canary acceptable".to_string(),
            canary_avg: Some(aggregate.canary_avg),
            active_avg: Some(aggregate.active_avg),
        })
    }

    /// Transactional errors during release/rollback get exactly one retry
    /// on `Conflict` before surfacing.
    async fn with_conflict_retry<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        match op().await {
            Err(CanaryError::Conflict(_)) => op().await,
            other => other,
        }
    }

    fn clone_for_task(&self) -> Self {
        Self {
            store: self.store.clone(),
            webhook: self.webhook.clone(),
            min_samples: self.min_samples,
            threshold: self.threshold,
            window_days: self.window_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_store::InMemoryStore;

    fn controller(store: Arc<dyn CanaryStore>) -> ReleaseController {
        ReleaseController::new(store, WebhookNotifier::disabled(), 30, 0.55, 30)
    }

    #[tokio::test]
    async fn release_requires_an_existing_suggestion() {
        let store: Arc<dyn CanaryStore> = Arc::new(InMemoryStore::new());
        let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
        let controller = controller(store);
        let err = controller.release(prompt.id, None, 20).await.unwrap_err();
        assert!(matches!(err, CanaryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn release_mints_a_canary_version() {
        let store: Arc<dyn CanaryStore> = Arc::new(InMemoryStore::new());
        let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
        store
            .insert_suggestion(prompt.id, "Summarize the article in 3 bullets.", "clarity")
            .await
            .unwrap();
        let controller = controller(store);
        let status = controller.release(prompt.id, None, 20).await.unwrap();
        assert_eq!(status.canary_percent, 20);
    }

    #[tokio::test]
    async fn rollback_without_canary_is_invalid() {
        let store: Arc<dyn CanaryStore> = Arc::new(InMemoryStore::new());
        let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
        store.bootstrap_release(&prompt).await.unwrap();
        let controller = controller(store);
        let err = controller.rollback(prompt.id, None).await.unwrap_err();
        assert!(matches!(err, CanaryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn check_with_no_canary_is_a_noop() {
        let store: Arc<dyn CanaryStore> = Arc::new(InMemoryStore::new());
        let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
        store.bootstrap_release(&prompt).await.unwrap();
        let controller = controller(store);
        let result = controller.check(prompt.id, None, None, None).await.unwrap();
        assert!(!result.rolled_back);
        assert_eq!(result.reason, "no active canary");
    }
}
