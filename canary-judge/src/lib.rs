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

//! The LLM-judge adapter: two effectful operations with a
//! never-fail contract. Both `judge` and `rewrite` return a usable value
//! directly rather than a `Result`, so callers can never forget to handle
//! an error arm that doesn't exist.

mod openai;

pub use openai::OpenAiJudge;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResult {
    pub clarity: f64,
    pub specificity: f64,
    pub hallucination_risk: f64,
    pub overall: f64,
    pub notes: String,
}

impl JudgeResult {
    pub fn fallback() -> Self {
        Self {
            clarity: 0.7,
            specificity: 0.6,
            hallucination_risk: 0.4,
            overall: 0.65,
            notes: "Tighten wording; add explicit constraints and success criteria.".to_string(),
        }
    }
}

fn rewrite_fallback(original: &str) -> String {
    format!(
        "{original} (Rewrite: be specific, add constraints, measurable success criteria.)"
    )
}

/// Effectful LLM operations with a guaranteed-return contract: on any
/// failure (missing credentials, network, timeout, malformed JSON) the
/// implementation returns a well-formed fallback instead of propagating an
/// error.
#[async_trait]
pub trait LlmJudge: Send + Sync {
    async fn judge(&self, prompt: &str, response: Option<&str>) -> JudgeResult;
    async fn rewrite(&self, original: &str, notes: Option<&str>) -> String;
}

/// Returned whenever `OPENAI_API_KEY` is empty: always the fallback, no
/// network attempt made.
pub struct NullJudge;

#[async_trait]
impl LlmJudge for NullJudge {
    async fn judge(&self, _prompt: &str, _response: Option<&str>) -> JudgeResult {
        JudgeResult::fallback()
    }

    async fn rewrite(&self, original: &str, _notes: Option<&str>) -> String {
        rewrite_fallback(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_judge_always_returns_fallback() {
        let judge = NullJudge;
        let result = judge.judge("anything", None).await;
        assert_eq!(result, JudgeResult::fallback());

        let rewritten = judge.rewrite("do the thing", None).await;
        assert_eq!(
            rewritten,
            "do the thing (Rewrite: be specific, add constraints, measurable success criteria.)"
        );
    }
}
