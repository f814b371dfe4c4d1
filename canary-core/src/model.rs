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

//! The six entities of the data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{
    EvaluationId, PromptId, ReleaseId, ResponseId, RollbackEventId, SuggestionId, VersionId,
};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prompt {
    pub id: PromptId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromptVersion {
    pub id: VersionId,
    pub prompt_id: PromptId,
    pub version: i32,
    pub text: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PromptRelease {
    pub id: ReleaseId,
    pub prompt_id: PromptId,
    pub active_version_id: VersionId,
    pub canary_version_id: Option<VersionId>,
    pub canary_percent: i32,
}

impl PromptRelease {
    /// canary_version_id is null iff canary_percent == 0.
    pub fn has_live_canary(&self) -> bool {
        self.canary_version_id.is_some() && self.canary_percent > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub prompt_id: PromptId,
    pub suggested_text: String,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub prompt_id: PromptId,
    pub response_id: Option<ResponseId>,
    pub length_score: f64,
    pub clarity_score: f64,
    pub toxicity_score: f64,
    pub overall_score: f64,
    pub notes: String,
    pub is_canary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Response {
    pub id: ResponseId,
    pub prompt_id: PromptId,
    pub text: String,
    pub model_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RollbackEvent {
    pub id: RollbackEventId,
    pub prompt_id: PromptId,
    pub from_version_id: VersionId,
    pub to_version_id: VersionId,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feedback {
    pub id: i64,
    pub prompt_id: PromptId,
    pub response_id: Option<ResponseId>,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
