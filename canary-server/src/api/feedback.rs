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

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use canary_core::{PromptId, ResponseId};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub prompt_id: PromptId,
    pub response_id: Option<ResponseId>,
    pub rating: i32,
    pub comment: Option<String>,
}

/// POST /feedback — persists human feedback on a served response.
pub async fn feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::validation(
            StatusCode::UNPROCESSABLE_ENTITY,
            "rating must be between 1 and 5",
        ));
    }

    let prompt = state
        .store
        .get_prompt(req.prompt_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("prompt {}", req.prompt_id)))?;

    if let Some(response_id) = req.response_id {
        let response = state
            .store
            .get_response(response_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("response {response_id}")))?;
        if response.prompt_id != prompt.id {
            return Err(ApiError::validation(
                StatusCode::BAD_REQUEST,
                "response does not belong to this prompt",
            ));
        }
    }

    let feedback = state
        .store
        .insert_feedback(prompt.id, req.response_id, req.rating, req.comment.as_deref())
        .await?;

    Ok(Json(feedback))
}
