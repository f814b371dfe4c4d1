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

//! Wires the Validate/Resolve/Optional-response/Select-version/Score/
//! Combine/Persist steps into a single entry point.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use canary_core::{CanaryError, PromptId, Result, ResponseId, VersionId};
use canary_judge::LlmJudge;
use canary_router::Router;
use canary_scoring::HeuristicScores;
use canary_store::{CanaryStore, NewEvaluation};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeInput {
    pub prompt: Option<String>,
    pub prompt_id: Option<PromptId>,
    pub response: Option<String>,
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeOutcome {
    pub prompt_id: PromptId,
    pub version_id: Option<VersionId>,
    pub is_canary: bool,
    pub response_id: Option<ResponseId>,
    pub scores: HeuristicScores,
    pub overall: f64,
    pub notes: String,
}

pub struct AnalyzePipeline {
    store: std::sync::Arc<dyn CanaryStore>,
    judge: std::sync::Arc<dyn LlmJudge>,
}

impl AnalyzePipeline {
    pub fn new(store: std::sync::Arc<dyn CanaryStore>, judge: std::sync::Arc<dyn LlmJudge>) -> Self {
        Self { store, judge }
    }

    pub async fn analyze(&self, input: AnalyzeInput) -> Result<AnalyzeOutcome> {
        self.analyze_inner(input).await
    }

    /// Same as [`Self::analyze`] but bounds every Store call with `deadline`.
    /// If `deadline` elapses while the pipeline is still waiting on the
    /// store, the call fails with `CanaryError::DeadlineExceeded` rather than
    /// continuing to hold the request open. A `LlmJudge` call is never the source of that error: it
    /// carries its own bounded timeout and always resolves to a usable
    /// value.
    pub async fn analyze_with_deadline(
        &self,
        input: AnalyzeInput,
        deadline: Duration,
    ) -> Result<AnalyzeOutcome> {
        match tokio::time::timeout(deadline, self.analyze_inner(input)).await {
            Ok(result) => result,
            Err(_) => Err(CanaryError::DeadlineExceeded),
        }
    }

    async fn analyze_inner(&self, input: AnalyzeInput) -> Result<AnalyzeOutcome> {
        let prompt_text = input.prompt.as_deref().map(str::trim).unwrap_or("");
        if prompt_text.is_empty() && input.prompt_id.is_none() {
            return Err(CanaryError::InvalidArgument(
                "either prompt text or prompt_id is required".to_string(),
            ));
        }

        let prompt = match input.prompt_id {
            Some(id) => self
                .store
                .get_prompt(id)
                .await?
                .ok_or_else(|| CanaryError::NotFound(format!("prompt {id}")))?,
            None => self.store.insert_prompt(prompt_text).await?,
        };

        let response_id = match input.response.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let model_name = input.model_name.as_deref().unwrap_or("unknown");
                let response = self.store.insert_response(prompt.id, text, model_name).await?;
                Some(response.id)
            }
            _ => None,
        };

        let routed = Router::choose_version(self.store.as_ref(), prompt.id).await?;

        let scores = canary_scoring::score(&routed.text);
        let judged = self
            .judge
            .judge(&routed.text, input.response.as_deref())
            .await;

        let overall = round3((scores.length + scores.clarity + scores.toxicity) / 3.0);

        let evaluation = self
            .store
            .insert_evaluation(NewEvaluation {
                prompt_id: prompt.id,
                response_id,
                length_score: scores.length,
                clarity_score: scores.clarity,
                toxicity_score: scores.toxicity,
                overall_score: overall,
                notes: judged.notes.clone(),
                is_canary: routed.is_canary,
            })
            .await?;

        Ok(AnalyzeOutcome {
            prompt_id: prompt.id,
            version_id: routed.version_id,
            is_canary: evaluation.is_canary,
            response_id,
            scores,
            overall,
            notes: judged.notes,
        })
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_judge::NullJudge;
    use canary_store::InMemoryStore;
    use std::sync::Arc;

    fn pipeline() -> AnalyzePipeline {
        AnalyzePipeline::new(Arc::new(InMemoryStore::new()), Arc::new(NullJudge))
    }

    #[tokio::test]
    async fn rejects_empty_input() {
        let pipeline = pipeline();
        let err = pipeline.analyze(AnalyzeInput::default()).await.unwrap_err();
        assert!(matches!(err, CanaryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn unknown_prompt_id_is_not_found() {
        let pipeline = pipeline();
        let input = AnalyzeInput {
            prompt_id: Some(PromptId(42)),
            ..Default::default()
        };
        let err = pipeline.analyze(input).await.unwrap_err();
        assert!(matches!(err, CanaryError::NotFound(_)));
    }

    #[tokio::test]
    async fn scores_a_fresh_prompt_and_persists_evaluation() {
        let pipeline = pipeline();
        let input = AnalyzeInput {
            prompt: Some("Summarize the article in 3 bullets.".to_string()),
            ..Default::default()
        };
        let outcome = pipeline.analyze(input).await.unwrap();
        assert!(!outcome.is_canary);
        assert_eq!(outcome.notes, canary_judge::JudgeResult::fallback().notes);
        assert!(outcome.overall > 0.0);
    }

    #[tokio::test]
    async fn records_an_optional_response() {
        let pipeline = pipeline();
        let input = AnalyzeInput {
            prompt: Some("Summarize the article in 3 bullets.".to_string()),
            response: Some("Here are three bullets.".to_string()),
            model_name: Some("gpt-4o-mini".to_string()),
            ..Default::default()
        };
        let outcome = pipeline.analyze(input).await.unwrap();
        assert!(outcome.response_id.is_some());
    }
}
