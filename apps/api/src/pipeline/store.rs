//! Pipeline Store: read and keyed-write access to an application's
//! `interview_pipeline` document.
//!
//! Writes are per-round merges, never a whole-document replace, so a
//! concurrent edit to a sibling round is not lost. `write_planned` decides
//! what to write from the document as it stands under the write lock and
//! applies every merge as one unit: either all land or none do.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::application::ApplicationPipelineRow;
use crate::pipeline::error::PipelineError;
use crate::pipeline::model::RoundPatch;

/// Given the stored document, returns the round patches to merge into it.
pub type WritePlan<'a> =
    dyn Fn(&Value) -> Result<Vec<(String, RoundPatch)>, PipelineError> + Send + Sync + 'a;

#[derive(Debug)]
pub struct PlannedWrite {
    /// The document after every merge.
    pub pipeline: Value,
    /// Rounds that were written, in plan order.
    pub rounds: Vec<String>,
}

#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Raw stored pipeline document; `{}` when the application has none yet.
    async fn get_pipeline(&self, application_id: Uuid) -> Result<Value, PipelineError>;

    /// Merges `patch` into one round and returns the updated document.
    async fn upsert_round(
        &self,
        application_id: Uuid,
        round: &str,
        patch: &RoundPatch,
    ) -> Result<Value, PipelineError> {
        let plan = |_: &Value| -> Result<Vec<(String, RoundPatch)>, PipelineError> {
            Ok(vec![(round.to_string(), patch.clone())])
        };
        Ok(self.write_planned(application_id, &plan).await?.pipeline)
    }

    /// Reads the document under the application's write lock, runs `plan` on
    /// it and merges the returned patches before the lock is released. A plan
    /// error writes nothing.
    async fn write_planned(
        &self,
        application_id: Uuid,
        plan: &WritePlan<'_>,
    ) -> Result<PlannedWrite, PipelineError>;

    async fn list_applications(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ApplicationPipelineRow>, PipelineError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

const UPSERT_ROUND_SQL: &str = r#"
    UPDATE applications
    SET interview_pipeline = jsonb_set(
            COALESCE(interview_pipeline, '{}'::jsonb),
            ARRAY[$2::text],
            COALESCE(interview_pipeline -> $2::text, '{}'::jsonb) || $3::jsonb,
            true
        ),
        updated_at = NOW()
    WHERE id = $1
    RETURNING interview_pipeline
"#;

#[derive(Clone)]
pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineStore for PgPipelineStore {
    async fn get_pipeline(&self, application_id: Uuid) -> Result<Value, PipelineError> {
        let row: Option<Option<Value>> =
            sqlx::query_scalar("SELECT interview_pipeline FROM applications WHERE id = $1")
                .bind(application_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            None => Err(PipelineError::ApplicationNotFound(application_id)),
            Some(pipeline) => Ok(pipeline.unwrap_or_else(|| json!({}))),
        }
    }

    async fn write_planned(
        &self,
        application_id: Uuid,
        plan: &WritePlan<'_>,
    ) -> Result<PlannedWrite, PipelineError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes writers on this application: the plan sees the
        // document exactly as the merges below find it.
        let locked: Option<Option<Value>> = sqlx::query_scalar(
            "SELECT interview_pipeline FROM applications WHERE id = $1 FOR UPDATE",
        )
        .bind(application_id)
        .fetch_optional(&mut *tx)
        .await?;
        let mut pipeline = locked
            .ok_or(PipelineError::ApplicationNotFound(application_id))?
            .unwrap_or_else(|| json!({}));

        let updates = plan(&pipeline)?;
        for (round, patch) in &updates {
            pipeline = sqlx::query_scalar(UPSERT_ROUND_SQL)
                .bind(application_id)
                .bind(round)
                .bind(patch.to_json())
                .fetch_one(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(
            "Merged {} round update(s) into application {application_id}",
            updates.len()
        );
        Ok(PlannedWrite {
            pipeline,
            rounds: updates.into_iter().map(|(round, _)| round).collect(),
        })
    }

    async fn list_applications(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ApplicationPipelineRow>, PipelineError> {
        Ok(sqlx::query_as::<_, ApplicationPipelineRow>(
            r#"
            SELECT id, user_id, company, position, date_applied, interview_pipeline
            FROM applications
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store with the same merge semantics as Postgres. A single
/// write lock covers each `write_planned` call.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryPipelineStore {
    applications: RwLock<HashMap<Uuid, ApplicationPipelineRow>>,
}

#[allow(dead_code)]
impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_application(&self, row: ApplicationPipelineRow) {
        self.applications.write().await.insert(row.id, row);
    }
}

/// Merges a patch's set fields into `pipeline[round]`, creating either level as needed.
fn merge_round(pipeline: &mut Value, round: &str, patch: &RoundPatch) {
    if !pipeline.is_object() {
        *pipeline = Value::Object(Map::new());
    }
    let Value::Object(rounds) = pipeline else {
        return;
    };
    let entry = rounds
        .entry(round.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let (Value::Object(fields), Value::Object(changes)) = (entry, patch.to_json()) {
        fields.extend(changes);
    }
}

#[async_trait]
impl PipelineStore for MemoryPipelineStore {
    async fn get_pipeline(&self, application_id: Uuid) -> Result<Value, PipelineError> {
        let applications = self.applications.read().await;
        let row = applications
            .get(&application_id)
            .ok_or(PipelineError::ApplicationNotFound(application_id))?;
        Ok(row.interview_pipeline.clone().unwrap_or_else(|| json!({})))
    }

    async fn write_planned(
        &self,
        application_id: Uuid,
        plan: &WritePlan<'_>,
    ) -> Result<PlannedWrite, PipelineError> {
        let mut applications = self.applications.write().await;
        let row = applications
            .get_mut(&application_id)
            .ok_or(PipelineError::ApplicationNotFound(application_id))?;
        let mut pipeline = row.interview_pipeline.clone().unwrap_or_else(|| json!({}));

        let updates = plan(&pipeline)?;
        for (round, patch) in &updates {
            merge_round(&mut pipeline, round, patch);
        }
        row.interview_pipeline = Some(pipeline.clone());

        Ok(PlannedWrite {
            pipeline,
            rounds: updates.into_iter().map(|(round, _)| round).collect(),
        })
    }

    async fn list_applications(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ApplicationPipelineRow>, PipelineError> {
        let applications = self.applications.read().await;
        Ok(applications
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }
}
