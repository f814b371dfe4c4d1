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

use async_trait::async_trait;
use std::time::Duration;

use crate::{rewrite_fallback, JudgeResult, LlmJudge};

/// OpenAI chat-completions backed judge. Configuration (model, temperature,
/// timeout) is opaque to callers; only the never-fail
/// contract is observable.
pub struct OpenAiJudge {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiJudge {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.0,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn chat(&self, system: &str, user: String) -> Result<serde_json::Value, String> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": self.temperature,
            "response_format": { "type": "json_object" }
        });

        let call = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send();

        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| "timeout".to_string())?
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("non-2xx status: {}", response.status()));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or("missing content")?;
        serde_json::from_str(content).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl LlmJudge for OpenAiJudge {
    async fn judge(&self, prompt: &str, response: Option<&str>) -> JudgeResult {
        let user = match response {
            Some(r) => format!(
                "Evaluate this prompt/response pair. Prompt:\n{prompt}\n\nResponse:\n{r}\n\n\
                 Return JSON with fields clarity, specificity, hallucination_risk, overall \
                 (each 0..1) and notes (string)."
            ),
            None => format!(
                "Evaluate this prompt on its own. Prompt:\n{prompt}\n\n\
                 Return JSON with fields clarity, specificity, hallucination_risk, overall \
                 (each 0..1) and notes (string)."
            ),
        };

        match self.chat("You are an expert prompt evaluator. Respond only with JSON.", user).await {
            Ok(value) => parse_judge_result(&value).unwrap_or_else(|| {
                tracing::warn!("judge response malformed, falling back");
                JudgeResult::fallback()
            }),
            Err(err) => {
                tracing::warn!(error = %err, "judge call failed, falling back");
                JudgeResult::fallback()
            }
        }
    }

    async fn rewrite(&self, original: &str, notes: Option<&str>) -> String {
        let user = match notes {
            Some(n) => format!(
                "Rewrite this prompt to be clearer and more specific, addressing: {n}\n\n{original}"
            ),
            None => format!("Rewrite this prompt to be clearer and more specific:\n\n{original}"),
        };

        match self.chat("You are an expert prompt engineer. Respond only with JSON: {\"rewritten\": \"...\"}.", user).await {
            Ok(value) => value["rewritten"]
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| {
                    tracing::warn!("rewrite response malformed, falling back");
                    rewrite_fallback(original)
                }),
            Err(err) => {
                tracing::warn!(error = %err, "rewrite call failed, falling back");
                rewrite_fallback(original)
            }
        }
    }
}

fn parse_judge_result(value: &serde_json::Value) -> Option<JudgeResult> {
    Some(JudgeResult {
        clarity: value["clarity"].as_f64()?,
        specificity: value["specificity"].as_f64()?,
        hallucination_risk: value["hallucination_risk"].as_f64()?,
        overall: value["overall"].as_f64()?,
        notes: value["notes"].as_str().unwrap_or_default().to_string(),
    })
}
