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

//! Postgres-backed implementation of [`CanaryStore`] on `sqlx`, grounded in
//! the connection-pool and `#[derive(sqlx::FromRow)]` conventions used
//! elsewhere in the reference workspace's database crates.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};

use canary_core::{
    CanaryError, Evaluation, Feedback, Prompt, PromptId, PromptRelease, PromptVersion, Response,
    ResponseId, Result, RollbackEvent, SuggestionId, Suggestion, VersionId,
};

use crate::{clamp_percent, not_found, CanaryStore, EvalAggregate, NewEvaluation, PromptReportRow};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .map_err(CanaryError::from)?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CanaryError::Internal(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn locked_release(
        tx: &mut Transaction<'_, Postgres>,
        prompt_id: PromptId,
    ) -> Result<PromptRelease> {
        sqlx::query_as::<_, PromptRelease>(
            "SELECT id, prompt_id, active_version_id, canary_version_id, canary_percent \
             FROM prompt_releases WHERE prompt_id = $1 FOR UPDATE",
        )
        .bind(prompt_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| not_found("release"))
    }
}

#[async_trait]
impl CanaryStore for PostgresStore {
    async fn get_prompt(&self, id: PromptId) -> Result<Option<Prompt>> {
        let row = sqlx::query_as::<_, Prompt>("SELECT id, text, created_at FROM prompts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_prompt(&self, text: &str) -> Result<Prompt> {
        let prompt = sqlx::query_as::<_, Prompt>(
            "INSERT INTO prompts (text) VALUES ($1) RETURNING id, text, created_at",
        )
        .bind(text)
        .fetch_one(&self.pool)
        .await?;
        Ok(prompt)
    }

    async fn get_release(&self, prompt_id: PromptId) -> Result<Option<PromptRelease>> {
        let row = sqlx::query_as::<_, PromptRelease>(
            "SELECT id, prompt_id, active_version_id, canary_version_id, canary_percent \
             FROM prompt_releases WHERE prompt_id = $1",
        )
        .bind(prompt_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_version(&self, id: VersionId) -> Result<Option<PromptVersion>> {
        let row = sqlx::query_as::<_, PromptVersion>(
            "SELECT id, prompt_id, version, text, is_active, created_at \
             FROM prompt_versions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn bootstrap_release(&self, prompt: &Prompt) -> Result<(PromptRelease, PromptVersion)> {
        let mut tx = self.pool.begin().await?;

        if let Some(release) = sqlx::query_as::<_, PromptRelease>(
            "SELECT id, prompt_id, active_version_id, canary_version_id, canary_percent \
             FROM prompt_releases WHERE prompt_id = $1 FOR UPDATE",
        )
        .bind(prompt.id)
        .fetch_optional(&mut *tx)
        .await?
        {
            let active = sqlx::query_as::<_, PromptVersion>(
                "SELECT id, prompt_id, version, text, is_active, created_at \
                 FROM prompt_versions WHERE id = $1",
            )
            .bind(release.active_version_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok((release, active));
        }

        let version = sqlx::query_as::<_, PromptVersion>(
            "INSERT INTO prompt_versions (prompt_id, version, text, is_active) \
             VALUES ($1, 1, $2, true) \
             RETURNING id, prompt_id, version, text, is_active, created_at",
        )
        .bind(prompt.id)
        .bind(&prompt.text)
        .fetch_one(&mut *tx)
        .await?;

        let release = sqlx::query_as::<_, PromptRelease>(
            "INSERT INTO prompt_releases (prompt_id, active_version_id, canary_version_id, canary_percent) \
             VALUES ($1, $2, NULL, 0) \
             RETURNING id, prompt_id, active_version_id, canary_version_id, canary_percent",
        )
        .bind(prompt.id)
        .bind(version.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((release, version))
    }

    async fn insert_suggestion(
        &self,
        prompt_id: PromptId,
        suggested_text: &str,
        rationale: &str,
    ) -> Result<Suggestion> {
        let suggestion = sqlx::query_as::<_, Suggestion>(
            "INSERT INTO suggestions (prompt_id, suggested_text, rationale) \
             VALUES ($1, $2, $3) \
             RETURNING id, prompt_id, suggested_text, rationale, created_at",
        )
        .bind(prompt_id)
        .bind(suggested_text)
        .bind(rationale)
        .fetch_one(&self.pool)
        .await?;
        Ok(suggestion)
    }

    async fn get_suggestion(&self, id: SuggestionId) -> Result<Option<Suggestion>> {
        let row = sqlx::query_as::<_, Suggestion>(
            "SELECT id, prompt_id, suggested_text, rationale, created_at \
             FROM suggestions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn latest_suggestion(&self, prompt_id: PromptId) -> Result<Option<Suggestion>> {
        let row = sqlx::query_as::<_, Suggestion>(
            "SELECT id, prompt_id, suggested_text, rationale, created_at \
             FROM suggestions WHERE prompt_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(prompt_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn release_canary(
        &self,
        release: &PromptRelease,
        suggestion: &Suggestion,
        canary_percent: i32,
    ) -> Result<PromptRelease> {
        let mut tx = self.pool.begin().await?;
        let current = Self::locked_release(&mut tx, release.prompt_id).await?;

        let active: (i32,) = sqlx::query_as("SELECT version FROM prompt_versions WHERE id = $1")
            .bind(current.active_version_id)
            .fetch_one(&mut *tx)
            .await?;
        let canary_version: Option<(i32,)> = match current.canary_version_id {
            Some(id) => sqlx::query_as("SELECT version FROM prompt_versions WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?,
            None => None,
        };
        let next_version = active.0.max(canary_version.map(|v| v.0).unwrap_or(0)) + 1;

        let new_version = sqlx::query_as::<_, PromptVersion>(
            "INSERT INTO prompt_versions (prompt_id, version, text, is_active) \
             VALUES ($1, $2, $3, false) \
             RETURNING id, prompt_id, version, text, is_active, created_at",
        )
        .bind(release.prompt_id)
        .bind(next_version)
        .bind(&suggestion.suggested_text)
        .fetch_one(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, PromptRelease>(
            "UPDATE prompt_releases SET canary_version_id = $2, canary_percent = $3 \
             WHERE prompt_id = $1 \
             RETURNING id, prompt_id, active_version_id, canary_version_id, canary_percent",
        )
        .bind(release.prompt_id)
        .bind(new_version.id)
        .bind(clamp_percent(canary_percent))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn rollback_canary(&self, release: &PromptRelease, reason: &str) -> Result<RollbackEvent> {
        let mut tx = self.pool.begin().await?;
        let current = Self::locked_release(&mut tx, release.prompt_id).await?;

        let canary_version_id = current
            .canary_version_id
            .ok_or_else(|| CanaryError::InvalidArgument("no canary to rollback".to_string()))?;

        let event = sqlx::query_as::<_, RollbackEvent>(
            "INSERT INTO rollback_events (prompt_id, from_version_id, to_version_id, reason) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, prompt_id, from_version_id, to_version_id, reason, created_at",
        )
        .bind(release.prompt_id)
        .bind(canary_version_id)
        .bind(current.active_version_id)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE prompt_releases SET canary_version_id = NULL, canary_percent = 0 WHERE prompt_id = $1")
            .bind(release.prompt_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(event)
    }

    async fn insert_response(
        &self,
        prompt_id: PromptId,
        text: &str,
        model_name: &str,
    ) -> Result<Response> {
        let response = sqlx::query_as::<_, Response>(
            "INSERT INTO responses (prompt_id, text, model_name) \
             VALUES ($1, $2, $3) \
             RETURNING id, prompt_id, text, model_name, created_at",
        )
        .bind(prompt_id)
        .bind(text)
        .bind(model_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(response)
    }

    async fn get_response(&self, id: ResponseId) -> Result<Option<Response>> {
        let row = sqlx::query_as::<_, Response>(
            "SELECT id, prompt_id, text, model_name, created_at FROM responses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_evaluation(&self, new_eval: NewEvaluation) -> Result<Evaluation> {
        let evaluation = sqlx::query_as::<_, Evaluation>(
            "INSERT INTO evaluations \
             (prompt_id, response_id, length_score, clarity_score, toxicity_score, overall_score, notes, is_canary) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, prompt_id, response_id, length_score, clarity_score, toxicity_score, \
                       overall_score, notes, is_canary, created_at",
        )
        .bind(new_eval.prompt_id)
        .bind(new_eval.response_id)
        .bind(new_eval.length_score)
        .bind(new_eval.clarity_score)
        .bind(new_eval.toxicity_score)
        .bind(new_eval.overall_score)
        .bind(&new_eval.notes)
        .bind(new_eval.is_canary)
        .fetch_one(&self.pool)
        .await?;
        Ok(evaluation)
    }

    async fn aggregate_evaluations(
        &self,
        prompt_id: PromptId,
        window_days: i64,
    ) -> Result<EvalAggregate> {
        let row = sqlx::query(
            "SELECT \
                COALESCE(AVG(overall_score) FILTER (WHERE is_canary), 0.0) AS canary_avg, \
                COUNT(*) FILTER (WHERE is_canary) AS n_canary, \
                COALESCE(AVG(overall_score) FILTER (WHERE NOT is_canary), 0.0) AS active_avg, \
                COUNT(*) FILTER (WHERE NOT is_canary) AS n_active \
             FROM evaluations \
             WHERE prompt_id = $1 AND created_at >= now() - make_interval(days => $2::int)",
        )
        .bind(prompt_id)
        .bind(window_days as i32)
        .fetch_one(&self.pool)
        .await?;

        Ok(EvalAggregate {
            canary_avg: row.try_get("canary_avg")?,
            n_canary: row.try_get("n_canary")?,
            active_avg: row.try_get("active_avg")?,
            n_active: row.try_get("n_active")?,
        })
    }

    async fn list_evaluations(&self, prompt_id: PromptId, limit: i64) -> Result<Vec<Evaluation>> {
        let rows = sqlx::query_as::<_, Evaluation>(
            "SELECT id, prompt_id, response_id, length_score, clarity_score, toxicity_score, \
                    overall_score, notes, is_canary, created_at \
             FROM evaluations WHERE prompt_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(prompt_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_suggestions(&self, prompt_id: PromptId, limit: i64) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query_as::<_, Suggestion>(
            "SELECT id, prompt_id, suggested_text, rationale, created_at \
             FROM suggestions WHERE prompt_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(prompt_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_rollbacks(&self, prompt_id: PromptId, limit: i64) -> Result<Vec<RollbackEvent>> {
        let rows = sqlx::query_as::<_, RollbackEvent>(
            "SELECT id, prompt_id, from_version_id, to_version_id, reason, created_at \
             FROM rollback_events WHERE prompt_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(prompt_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_feedback(
        &self,
        prompt_id: PromptId,
        response_id: Option<ResponseId>,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Feedback> {
        let feedback = sqlx::query_as::<_, Feedback>(
            "INSERT INTO feedback (prompt_id, response_id, rating, comment) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, prompt_id, response_id, rating, comment, created_at",
        )
        .bind(prompt_id)
        .bind(response_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await?;
        Ok(feedback)
    }

    async fn report(&self, window_days: i64) -> Result<Vec<PromptReportRow>> {
        let rows = sqlx::query(
            "SELECT p.id AS prompt_id, \
                    COUNT(e.id) AS n_evaluations, \
                    COALESCE(AVG(e.overall_score), 0.0) AS avg_overall, \
                    COUNT(e.id) FILTER (WHERE e.is_canary) AS n_canary, \
                    (SELECT COUNT(*) FROM rollback_events r \
                       WHERE r.prompt_id = p.id AND r.created_at >= now() - make_interval(days => $1::int)) AS n_rollbacks \
             FROM prompts p \
             LEFT JOIN evaluations e \
               ON e.prompt_id = p.id AND e.created_at >= now() - make_interval(days => $1::int) \
             GROUP BY p.id",
        )
        .bind(window_days as i32)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PromptReportRow {
                    prompt_id: row.try_get("prompt_id")?,
                    n_evaluations: row.try_get("n_evaluations")?,
                    avg_overall: row.try_get("avg_overall")?,
                    n_canary: row.try_get("n_canary")?,
                    n_rollbacks: row.try_get("n_rollbacks")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(CanaryError::from)
    }
}
