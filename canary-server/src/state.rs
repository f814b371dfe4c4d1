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

use std::sync::Arc;

use canary_core::AppConfig;
use canary_judge::LlmJudge;
use canary_pipeline::AnalyzePipeline;
use canary_release::ReleaseController;
use canary_store::CanaryStore;

/// Shared application state, injected into every handler via
/// `axum::extract::State`. No module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CanaryStore>,
    pub judge: Arc<dyn LlmJudge>,
    pub pipeline: Arc<AnalyzePipeline>,
    pub release: Arc<ReleaseController>,
    pub config: Arc<AppConfig>,
}
