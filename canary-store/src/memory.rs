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

//! In-process implementation of [`CanaryStore`], used by every crate's
//! unit tests and `canary-server`'s integration tests so the engine can be
//! exercised end-to-end without a live Postgres. A single `RwLock` plays
//! the role of the row-level lock required around the read-modify-write
//! in `release_canary`/`rollback_canary`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;

use canary_core::{
    CanaryError, Evaluation, EvaluationId, Feedback, Prompt, PromptId, PromptRelease,
    PromptVersion, Response, ResponseId, Result, RollbackEvent, RollbackEventId, SuggestionId,
    Suggestion, VersionId,
};

use crate::{clamp_percent, not_found, CanaryStore, EvalAggregate, NewEvaluation, PromptReportRow};

#[derive(Default)]
struct Inner {
    next_prompt_id: i64,
    next_version_id: i64,
    next_release_id: i64,
    next_suggestion_id: i64,
    next_response_id: i64,
    next_eval_id: i64,
    next_rollback_id: i64,
    next_feedback_id: i64,

    prompts: HashMap<PromptId, Prompt>,
    versions: HashMap<VersionId, PromptVersion>,
    releases: HashMap<PromptId, PromptRelease>,
    suggestions: HashMap<SuggestionId, Suggestion>,
    responses: HashMap<ResponseId, Response>,
    evaluations: HashMap<EvaluationId, Evaluation>,
    rollbacks: HashMap<RollbackEventId, RollbackEvent>,
    feedback: HashMap<i64, Feedback>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CanaryStore for InMemoryStore {
    async fn get_prompt(&self, id: PromptId) -> Result<Option<Prompt>> {
        Ok(self.inner.read().prompts.get(&id).cloned())
    }

    async fn insert_prompt(&self, text: &str) -> Result<Prompt> {
        let mut inner = self.inner.write();
        inner.next_prompt_id += 1;
        let id = PromptId(inner.next_prompt_id);
        let prompt = Prompt {
            id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        inner.prompts.insert(id, prompt.clone());
        Ok(prompt)
    }

    async fn get_release(&self, prompt_id: PromptId) -> Result<Option<PromptRelease>> {
        Ok(self.inner.read().releases.get(&prompt_id).cloned())
    }

    async fn get_version(&self, id: VersionId) -> Result<Option<PromptVersion>> {
        Ok(self.inner.read().versions.get(&id).cloned())
    }

    async fn bootstrap_release(&self, prompt: &Prompt) -> Result<(PromptRelease, PromptVersion)> {
        let mut inner = self.inner.write();
        if let Some(release) = inner.releases.get(&prompt.id).cloned() {
            let active = inner
                .versions
                .get(&release.active_version_id)
                .cloned()
                .ok_or_else(|| not_found("active version"))?;
            return Ok((release, active));
        }

        inner.next_version_id += 1;
        let version_id = VersionId(inner.next_version_id);
        let version = PromptVersion {
            id: version_id,
            prompt_id: prompt.id,
            version: 1,
            text: prompt.text.clone(),
            is_active: true,
            created_at: Utc::now(),
        };
        inner.versions.insert(version_id, version.clone());

        inner.next_release_id += 1;
        let release = PromptRelease {
            id: canary_core::ReleaseId(inner.next_release_id),
            prompt_id: prompt.id,
            active_version_id: version_id,
            canary_version_id: None,
            canary_percent: 0,
        };
        inner.releases.insert(prompt.id, release.clone());

        Ok((release, version))
    }

    async fn insert_suggestion(
        &self,
        prompt_id: PromptId,
        suggested_text: &str,
        rationale: &str,
    ) -> Result<Suggestion> {
        let mut inner = self.inner.write();
        inner.next_suggestion_id += 1;
        let id = SuggestionId(inner.next_suggestion_id);
        let suggestion = Suggestion {
            id,
            prompt_id,
            suggested_text: suggested_text.to_string(),
            rationale: rationale.to_string(),
            created_at: Utc::now(),
        };
        inner.suggestions.insert(id, suggestion.clone());
        Ok(suggestion)
    }

    async fn get_suggestion(&self, id: SuggestionId) -> Result<Option<Suggestion>> {
        Ok(self.inner.read().suggestions.get(&id).cloned())
    }

    async fn latest_suggestion(&self, prompt_id: PromptId) -> Result<Option<Suggestion>> {
        Ok(self
            .inner
            .read()
            .suggestions
            .values()
            .filter(|s| s.prompt_id == prompt_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn release_canary(
        &self,
        release: &PromptRelease,
        suggestion: &Suggestion,
        canary_percent: i32,
    ) -> Result<PromptRelease> {
        let mut inner = self.inner.write();
        let current = inner
            .releases
            .get(&release.prompt_id)
            .cloned()
            .ok_or_else(|| not_found("release"))?;

        let active = inner
            .versions
            .get(&current.active_version_id)
            .cloned()
            .ok_or_else(|| not_found("active version"))?;
        let canary = current
            .canary_version_id
            .and_then(|id| inner.versions.get(&id).cloned());

        let next_version = active.version.max(canary.map(|v| v.version).unwrap_or(0)) + 1;

        inner.next_version_id += 1;
        let new_version_id = VersionId(inner.next_version_id);
        let new_version = PromptVersion {
            id: new_version_id,
            prompt_id: release.prompt_id,
            version: next_version,
            text: suggestion.suggested_text.clone(),
            is_active: false,
            created_at: Utc::now(),
        };
        inner.versions.insert(new_version_id, new_version);

        let updated = PromptRelease {
            canary_version_id: Some(new_version_id),
            canary_percent: clamp_percent(canary_percent),
            ..current
        };
        inner.releases.insert(release.prompt_id, updated.clone());
        Ok(updated)
    }

    async fn rollback_canary(&self, release: &PromptRelease, reason: &str) -> Result<RollbackEvent> {
        let mut inner = self.inner.write();
        let current = inner
            .releases
            .get(&release.prompt_id)
            .cloned()
            .ok_or_else(|| not_found("release"))?;

        let canary_version_id = current
            .canary_version_id
            .ok_or_else(|| CanaryError::InvalidArgument("no canary to rollback".to_string()))?;

        inner.next_rollback_id += 1;
        let event = RollbackEvent {
            id: RollbackEventId(inner.next_rollback_id),
            prompt_id: release.prompt_id,
            from_version_id: canary_version_id,
            to_version_id: current.active_version_id,
            reason: reason.to_string(),
            created_at: Utc::now(),
        };
        inner.rollbacks.insert(event.id, event.clone());

        let updated = PromptRelease {
            canary_version_id: None,
            canary_percent: 0,
            ..current
        };
        inner.releases.insert(release.prompt_id, updated);

        Ok(event)
    }

    async fn insert_response(
        &self,
        prompt_id: PromptId,
        text: &str,
        model_name: &str,
    ) -> Result<Response> {
        let mut inner = self.inner.write();
        inner.next_response_id += 1;
        let id = ResponseId(inner.next_response_id);
        let response = Response {
            id,
            prompt_id,
            text: text.to_string(),
            model_name: model_name.to_string(),
            created_at: Utc::now(),
        };
        inner.responses.insert(id, response.clone());
        Ok(response)
    }

    async fn get_response(&self, id: ResponseId) -> Result<Option<Response>> {
        Ok(self.inner.read().responses.get(&id).cloned())
    }

    async fn insert_evaluation(&self, new_eval: NewEvaluation) -> Result<Evaluation> {
        let mut inner = self.inner.write();
        inner.next_eval_id += 1;
        let id = EvaluationId(inner.next_eval_id);
        let evaluation = Evaluation {
            id,
            prompt_id: new_eval.prompt_id,
            response_id: new_eval.response_id,
            length_score: new_eval.length_score,
            clarity_score: new_eval.clarity_score,
            toxicity_score: new_eval.toxicity_score,
            overall_score: new_eval.overall_score,
            notes: new_eval.notes,
            is_canary: new_eval.is_canary,
            created_at: Utc::now(),
        };
        inner.evaluations.insert(id, evaluation.clone());
        Ok(evaluation)
    }

    async fn aggregate_evaluations(
        &self,
        prompt_id: PromptId,
        window_days: i64,
    ) -> Result<EvalAggregate> {
        let inner = self.inner.read();
        let cutoff = Utc::now() - Duration::days(window_days);

        let (canary_sum, n_canary) = inner
            .evaluations
            .values()
            .filter(|e| e.prompt_id == prompt_id && e.is_canary && e.created_at >= cutoff)
            .fold((0.0, 0i64), |(sum, n), e| (sum + e.overall_score, n + 1));

        let (active_sum, n_active) = inner
            .evaluations
            .values()
            .filter(|e| e.prompt_id == prompt_id && !e.is_canary && e.created_at >= cutoff)
            .fold((0.0, 0i64), |(sum, n), e| (sum + e.overall_score, n + 1));

        Ok(EvalAggregate {
            canary_avg: if n_canary > 0 { canary_sum / n_canary as f64 } else { 0.0 },
            n_canary,
            active_avg: if n_active > 0 { active_sum / n_active as f64 } else { 0.0 },
            n_active,
        })
    }

    async fn list_evaluations(&self, prompt_id: PromptId, limit: i64) -> Result<Vec<Evaluation>> {
        let inner = self.inner.read();
        let mut evals: Vec<Evaluation> = inner
            .evaluations
            .values()
            .filter(|e| e.prompt_id == prompt_id)
            .cloned()
            .collect();
        evals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        evals.truncate(limit.max(0) as usize);
        Ok(evals)
    }

    async fn list_suggestions(&self, prompt_id: PromptId, limit: i64) -> Result<Vec<Suggestion>> {
        let inner = self.inner.read();
        let mut suggestions: Vec<Suggestion> = inner
            .suggestions
            .values()
            .filter(|s| s.prompt_id == prompt_id)
            .cloned()
            .collect();
        suggestions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        suggestions.truncate(limit.max(0) as usize);
        Ok(suggestions)
    }

    async fn list_rollbacks(&self, prompt_id: PromptId, limit: i64) -> Result<Vec<RollbackEvent>> {
        let inner = self.inner.read();
        let mut rollbacks: Vec<RollbackEvent> = inner
            .rollbacks
            .values()
            .filter(|r| r.prompt_id == prompt_id)
            .cloned()
            .collect();
        rollbacks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rollbacks.truncate(limit.max(0) as usize);
        Ok(rollbacks)
    }

    async fn insert_feedback(
        &self,
        prompt_id: PromptId,
        response_id: Option<ResponseId>,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Feedback> {
        let mut inner = self.inner.write();
        inner.next_feedback_id += 1;
        let id = inner.next_feedback_id;
        let feedback = Feedback {
            id,
            prompt_id,
            response_id,
            rating,
            comment: comment.map(|s| s.to_string()),
            created_at: Utc::now(),
        };
        inner.feedback.insert(id, feedback.clone());
        Ok(feedback)
    }

    async fn report(&self, window_days: i64) -> Result<Vec<PromptReportRow>> {
        let inner = self.inner.read();
        let cutoff = Utc::now() - Duration::days(window_days);

        let mut rows = Vec::new();
        for prompt_id in inner.prompts.keys().copied() {
            let evals: Vec<&Evaluation> = inner
                .evaluations
                .values()
                .filter(|e| e.prompt_id == prompt_id && e.created_at >= cutoff)
                .collect();
            let n_evaluations = evals.len() as i64;
            let avg_overall = if n_evaluations > 0 {
                evals.iter().map(|e| e.overall_score).sum::<f64>() / n_evaluations as f64
            } else {
                0.0
            };
            let n_canary = evals.iter().filter(|e| e.is_canary).count() as i64;
            let n_rollbacks = inner
                .rollbacks
                .values()
                .filter(|r| r.prompt_id == prompt_id && r.created_at >= cutoff)
                .count() as i64;

            rows.push(PromptReportRow {
                prompt_id,
                n_evaluations,
                avg_overall,
                n_canary,
                n_rollbacks,
            });
        }
        Ok(rows)
    }
}
