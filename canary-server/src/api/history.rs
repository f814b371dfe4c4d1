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
use serde::{Deserialize, Serialize};

use canary_core::{Evaluation, PromptId, Suggestion};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub prompt_id: PromptId,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub prompt_text: String,
    pub evaluations: Vec<Evaluation>,
    pub suggestions: Vec<Suggestion>,
}

/// GET /history?prompt_id=N — returns a Prompt's text, evaluations, and
/// suggestions so far.
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = state
        .store
        .get_prompt(query.prompt_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("prompt {}", query.prompt_id)))?;

    let evaluations = state.store.list_evaluations(prompt.id, 100).await?;
    let suggestions = state.store.list_suggestions(prompt.id, 100).await?;

    Ok(Json(HistoryResponse {
        prompt_text: prompt.text,
        evaluations,
        suggestions,
    }))
}
