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

use axum::{extract::State, response::IntoResponse, Json};
use tracing::debug;

use canary_pipeline::AnalyzeInput;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /analyze — runs AnalyzePipeline end to end.
pub async fn analyze(
    State(state): State<AppState>,
    Json(input): Json<AnalyzeInput>,
) -> Result<impl IntoResponse, ApiError> {
    debug!(prompt_id = ?input.prompt_id, "analyze request");
    let outcome = state.pipeline.analyze(input).await?;
    Ok(Json(outcome))
}
