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

//! Best-effort notification of automatic rollback.
//! Failures never reach the caller; they are logged and dropped.

use std::time::Duration;

use canary_core::PromptId;
use serde_json::json;

#[derive(Clone)]
pub struct WebhookNotifier {
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { url, client }
    }

    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(5))
    }

    /// Fires the `prompt_canary_rollback` event. Runs detached: the caller
    /// never awaits network I/O and never sees a webhook failure.
    pub fn notify_rollback(&self, prompt_id: PromptId, message: String, canary_avg: f64, active_avg: f64) {
        let Some(url) = self.url.clone() else {
            return;
        };
        let client = self.client.clone();
        let body = json!({
            "type": "prompt_canary_rollback",
            "prompt_id": i64::from(prompt_id),
            "message": message,
            "canary_avg": canary_avg,
            "active_avg": active_avg,
        });

        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => {
                    tracing::warn!(status = %resp.status(), "rollback webhook returned non-2xx");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "rollback webhook delivery failed");
                }
            }
        });
    }
}
