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

//! Persistence abstraction over the six entities. Every
//! mutating operation that touches more than one row runs inside a single
//! transaction internally, so callers can never observe or split it.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use serde::Serialize;

use canary_core::{
    CanaryError, Evaluation, Feedback, Prompt, PromptId, PromptRelease, PromptVersion, Response,
    ResponseId, Result, RollbackEvent, SuggestionId, Suggestion, VersionId,
};

/// Fields needed to persist one `Evaluation`.
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub prompt_id: PromptId,
    pub response_id: Option<ResponseId>,
    pub length_score: f64,
    pub clarity_score: f64,
    pub toxicity_score: f64,
    pub overall_score: f64,
    pub notes: String,
    pub is_canary: bool,
}

/// Result of the windowed, `is_canary`-partitioned aggregate query used by
/// the canary health check. Nulls are treated as 0 when computing the
/// averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalAggregate {
    pub canary_avg: f64,
    pub n_canary: i64,
    pub active_avg: f64,
    pub n_active: i64,
}

/// One row of the cross-prompt `/report` aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct PromptReportRow {
    pub prompt_id: PromptId,
    pub n_evaluations: i64,
    pub avg_overall: f64,
    pub n_canary: i64,
    pub n_rollbacks: i64,
}

#[async_trait]
pub trait CanaryStore: Send + Sync {
    async fn get_prompt(&self, id: PromptId) -> Result<Option<Prompt>>;
    async fn insert_prompt(&self, text: &str) -> Result<Prompt>;

    async fn get_release(&self, prompt_id: PromptId) -> Result<Option<PromptRelease>>;
    async fn get_version(&self, id: VersionId) -> Result<Option<PromptVersion>>;

    /// Lazily bootstraps a version-1 release for a prompt that has none.
    /// Returns the existing release untouched if one is already present.
    async fn bootstrap_release(&self, prompt: &Prompt) -> Result<(PromptRelease, PromptVersion)>;

    async fn insert_suggestion(
        &self,
        prompt_id: PromptId,
        suggested_text: &str,
        rationale: &str,
    ) -> Result<Suggestion>;
    async fn get_suggestion(&self, id: SuggestionId) -> Result<Option<Suggestion>>;
    async fn latest_suggestion(&self, prompt_id: PromptId) -> Result<Option<Suggestion>>;

    /// Atomically mints a new version from `suggestion` and points the
    /// release's canary at it. `next_version` is
    /// computed by the implementation under the same row lock that updates
    /// the release, so two concurrent releases can never mint the same
    /// version number.
    async fn release_canary(
        &self,
        release: &PromptRelease,
        suggestion: &Suggestion,
        canary_percent: i32,
    ) -> Result<PromptRelease>;

    /// Atomically clears the canary and records a `RollbackEvent`. Used by
    /// both manual rollback and the automatic path; the caller decides the
    /// reason text and whether to fire a webhook.
    async fn rollback_canary(&self, release: &PromptRelease, reason: &str) -> Result<RollbackEvent>;

    async fn insert_response(
        &self,
        prompt_id: PromptId,
        text: &str,
        model_name: &str,
    ) -> Result<Response>;
    async fn get_response(&self, id: ResponseId) -> Result<Option<Response>>;

    async fn insert_evaluation(&self, new_eval: NewEvaluation) -> Result<Evaluation>;

    async fn aggregate_evaluations(
        &self,
        prompt_id: PromptId,
        window_days: i64,
    ) -> Result<EvalAggregate>;

    async fn list_evaluations(&self, prompt_id: PromptId, limit: i64) -> Result<Vec<Evaluation>>;
    async fn list_suggestions(&self, prompt_id: PromptId, limit: i64) -> Result<Vec<Suggestion>>;
    async fn list_rollbacks(&self, prompt_id: PromptId, limit: i64) -> Result<Vec<RollbackEvent>>;

    async fn insert_feedback(
        &self,
        prompt_id: PromptId,
        response_id: Option<ResponseId>,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Feedback>;

    async fn report(&self, window_days: i64) -> Result<Vec<PromptReportRow>>;
}

pub(crate) fn clamp_percent(requested: i32) -> i32 {
    requested.clamp(0, 100)
}

pub(crate) fn not_found(what: &str) -> CanaryError {
    CanaryError::NotFound(what.to_string())
}
