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
use serde::Serialize;

use canary_core::{PromptId, RollbackEvent, VersionId};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub active_version_id: VersionId,
    pub canary_version_id: Option<VersionId>,
    pub canary_percent: i32,
    pub recent_rollbacks: Vec<RollbackEvent>,
}

/// GET /prompts/{id}/status — current active/canary/percent plus the last 5
/// rollbacks.
pub async fn status(
    State(state): State<AppState>,
    Path(prompt_id): Path<PromptId>,
) -> Result<impl IntoResponse, ApiError> {
    let release = state
        .store
        .get_release(prompt_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("release for prompt {prompt_id}")))?;

    let recent_rollbacks = state.store.list_rollbacks(prompt_id, 5).await?;

    Ok(Json(StatusResponse {
        active_version_id: release.active_version_id,
        canary_version_id: release.canary_version_id,
        canary_percent: release.canary_percent,
        recent_rollbacks,
    }))
}
