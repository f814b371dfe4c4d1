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

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use canary_core::{PromptId, Suggestion};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OptimizeQuery {
    pub prompt_id: PromptId,
}

const DEFAULT_NOTES: &str = "Improve clarity; add constraints and success criteria.";

/// GET /optimize?prompt_id=N — asks the judge to rewrite the prompt and
/// stores the result as a Suggestion.
pub async fn optimize(
    State(state): State<AppState>,
    Query(query): Query<OptimizeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = state
        .store
        .get_prompt(query.prompt_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("prompt {}", query.prompt_id)))?;

    let notes = state
        .store
        .list_evaluations(prompt.id, 1)
        .await?
        .into_iter()
        .next()
        .map(|e| e.notes)
        .unwrap_or_else(|| DEFAULT_NOTES.to_string());

    let rewritten = state.judge.rewrite(&prompt.text, Some(&notes)).await;

    let suggestion: Suggestion = state
        .store
        .insert_suggestion(prompt.id, &rewritten, &notes)
        .await?;

    Ok(Json(suggestion))
}
