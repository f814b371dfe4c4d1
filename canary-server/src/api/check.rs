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
    response::IntoResponse,
    Json,
};

use canary_core::PromptId;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /prompts/{id}/check — synchronous `ReleaseController::check`.
pub async fn check(
    State(state): State<AppState>,
    Path(prompt_id): Path<PromptId>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.release.check(prompt_id, None, None, None).await?;
    Ok(Json(result))
}
