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

//! Immutable configuration constructed once at startup from the
//! environment and injected into every component that needs it. No
//! module-level singletons.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Store connection string.
    pub database_url: String,
    /// Empty/absent means LLMJudge permanently returns its fallback.
    pub openai_api_key: Option<String>,
    /// Empty/absent means no webhook is ever emitted.
    pub webhook_url: Option<String>,
    pub canary_min_samples: i64,
    pub canary_threshold: f64,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub default_window_days: i64,
    pub http_listen_addr: String,
    pub judge_timeout_ms: u64,
    pub judge_model: String,
    pub webhook_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/canary".to_string(),
            openai_api_key: None,
            webhook_url: None,
            canary_min_samples: 30,
            canary_threshold: 0.55,
            rate_limit_requests: 100,
            rate_limit_window_secs: 60,
            default_window_days: 30,
            http_listen_addr: "127.0.0.1:8080".to_string(),
            judge_timeout_ms: 10_000,
            judge_model: "gpt-4o-mini".to_string(),
            webhook_timeout_secs: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("DATABASE_URL") {
            config.database_url = v;
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            if !v.is_empty() {
                config.openai_api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("WEBHOOK_URL") {
            if !v.is_empty() {
                config.webhook_url = Some(v);
            }
        }
        if let Ok(v) = std::env::var("CANARY_MIN_SAMPLES") {
            if let Ok(parsed) = v.parse() {
                config.canary_min_samples = parsed;
            }
        }
        if let Ok(v) = std::env::var("CANARY_THRESHOLD") {
            if let Ok(parsed) = v.parse() {
                config.canary_threshold = parsed;
            }
        }
        if let Ok(v) = std::env::var("RATE_LIMIT_REQUESTS") {
            if let Ok(parsed) = v.parse() {
                config.rate_limit_requests = parsed;
            }
        }
        if let Ok(v) = std::env::var("RATE_LIMIT_WINDOW") {
            if let Ok(parsed) = v.parse() {
                config.rate_limit_window_secs = parsed;
            }
        }
        if let Ok(v) = std::env::var("DEFAULT_WINDOW_DAYS") {
            if let Ok(parsed) = v.parse() {
                config.default_window_days = parsed;
            }
        }
        if let Ok(v) = std::env::var("HTTP_LISTEN_ADDR") {
            config.http_listen_addr = v;
        }
        if let Ok(v) = std::env::var("JUDGE_MODEL") {
            if !v.is_empty() {
                config.judge_model = v;
            }
        }

        config
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }
        self.http_listen_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid HTTP_LISTEN_ADDR: {e}"))?;
        if !(self.canary_threshold > 0.0 && self.canary_threshold <= 1.0) {
            anyhow::bail!("CANARY_THRESHOLD must be in (0,1]");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.canary_min_samples, 30);
        assert!((config.canary_threshold - 0.55).abs() < 1e-9);
        assert_eq!(config.default_window_days, 30);
    }
}
