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
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use canary_core::{CanaryError, PromptId, SuggestionId};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub suggestion_id: Option<SuggestionId>,
    pub canary_percent: i32,
}

/// POST /prompts/{id}/release — `ReleaseController::release`.
pub async fn release(
    State(state): State<AppState>,
    Path(prompt_id): Path<PromptId>,
    Json(req): Json<ReleaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .release
        .release(prompt_id, req.suggestion_id, req.canary_percent)
        .await
        .map_err(|err| match err {
            CanaryError::InvalidArgument(msg) => {
                ApiError::validation(StatusCode::BAD_REQUEST, msg)
            }
            other => other.into(),
        })?;

    Ok(Json(status))
}
