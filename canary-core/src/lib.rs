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

//! Canary Core
//!
//! Shared types for the canary release engine: the six data-model entities,
//! the error taxonomy, integer id newtypes, and the immutable runtime
//! configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod model;

pub use config::AppConfig;
pub use error::{CanaryError, Result};
pub use ids::{
    EvaluationId, PromptId, ReleaseId, ResponseId, RollbackEventId, SuggestionId, VersionId,
};
pub use model::{Evaluation, Feedback, Prompt, PromptRelease, PromptVersion, Response, RollbackEvent, Suggestion};
