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

//! Stateless traffic split between a prompt's active and canary versions.
//! Carries no config and no long-lived state; every call takes the store
//! it should read through.

use rand::Rng;

use canary_core::{CanaryError, Result, VersionId};
use canary_store::CanaryStore;

/// Outcome of a single routing decision.
#[derive(Debug, Clone)]
pub struct RoutedVersion {
    pub text: String,
    pub is_canary: bool,
    pub version_id: Option<VersionId>,
}

pub struct Router;

impl Router {
    /// `ChooseVersion(prompt_id)`. Each call draws its own
    /// `rand::thread_rng()` — one per OS thread, never shared or
    /// re-seeded, so the split carries no cross-request bias and is never
    /// reused for anything security-sensitive.
    pub async fn choose_version(
        store: &dyn CanaryStore,
        prompt_id: canary_core::PromptId,
    ) -> Result<RoutedVersion> {
        let Some(prompt) = store.get_prompt(prompt_id).await? else {
            return Ok(RoutedVersion {
                text: String::new(),
                is_canary: false,
                version_id: None,
            });
        };

        let release = match store.get_release(prompt_id).await? {
            Some(release) => release,
            None => {
                let (release, _active) = store.bootstrap_release(&prompt).await?;
                release
            }
        };

        if release.has_live_canary() {
            let roll: u32 = rand::thread_rng().gen_range(1..=100);
            if roll <= release.canary_percent as u32 {
                let canary_id = release
                    .canary_version_id
                    .expect("has_live_canary guarantees canary_version_id is Some");
                let canary = store
                    .get_version(canary_id)
                    .await?
                    .ok_or_else(|| CanaryError::Internal("canary version vanished".to_string()))?;
                return Ok(RoutedVersion {
                    text: canary.text,
                    is_canary: true,
                    version_id: Some(canary.id),
                });
            }
        }

        let active = store
            .get_version(release.active_version_id)
            .await?
            .ok_or_else(|| CanaryError::Internal("active version vanished".to_string()))?;
        Ok(RoutedVersion {
            text: active.text,
            is_canary: false,
            version_id: Some(active.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_store::InMemoryStore;

    #[tokio::test]
    async fn missing_prompt_returns_empty_tuple() {
        let store = InMemoryStore::new();
        let routed = Router::choose_version(&store, canary_core::PromptId(999)).await.unwrap();
        assert_eq!(routed.text, "");
        assert!(!routed.is_canary);
        assert!(routed.version_id.is_none());
    }

    #[tokio::test]
    async fn bootstraps_and_routes_to_active_when_no_canary() {
        let store = InMemoryStore::new();
        let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
        let routed = Router::choose_version(&store, prompt.id).await.unwrap();
        assert_eq!(routed.text, "Summarize the article.");
        assert!(!routed.is_canary);
    }

    #[tokio::test]
    async fn zero_percent_canary_never_selected() {
        let store = InMemoryStore::new();
        let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
        let (release, _) = store.bootstrap_release(&prompt).await.unwrap();
        let suggestion = store
            .insert_suggestion(prompt.id, "Summarize the article in 3 bullets.", "clarity")
            .await
            .unwrap();
        store.release_canary(&release, &suggestion, 0).await.unwrap();

        for _ in 0..20 {
            let routed = Router::choose_version(&store, prompt.id).await.unwrap();
            assert!(!routed.is_canary);
        }
    }

    #[tokio::test]
    async fn hundred_percent_canary_always_selected() {
        let store = InMemoryStore::new();
        let prompt = store.insert_prompt("Summarize the article.").await.unwrap();
        let (release, _) = store.bootstrap_release(&prompt).await.unwrap();
        let suggestion = store
            .insert_suggestion(prompt.id, "Summarize the article in 3 bullets.", "clarity")
            .await
            .unwrap();
        store.release_canary(&release, &suggestion, 100).await.unwrap();

        for _ in 0..20 {
            let routed = Router::choose_version(&store, prompt.id).await.unwrap();
            assert!(routed.is_canary);
            assert_eq!(routed.text, "Summarize the article in 3 bullets.");
        }
    }
}
