//! Save and read paths that tie the store to the engine.
//!
//! A round save is one logical unit. The auto-advance decision is made inside
//! the store's locked write from the document as it stands then, so the
//! successor is never scheduled over an edit another session just made, and
//! a failure never leaves the round saved with its successor unscheduled.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::pipeline::advance::on_round_saved;
use crate::pipeline::error::PipelineError;
use crate::pipeline::model::{Pipeline, RoundOutcome, RoundPatch, RoundStatus};
use crate::pipeline::resolver::resolve_state;
use crate::pipeline::settings::PipelineSettings;
use crate::pipeline::sort_key::compare_entries;
use crate::pipeline::store::PipelineStore;
use crate::pipeline::view::summarize;

#[derive(Debug)]
pub struct SaveOutcome {
    pub pipeline: Pipeline,
    pub auto_advanced: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationListItem {
    pub id: Uuid,
    pub company: String,
    pub position: String,
    pub date_applied: Option<NaiveDate>,
    pub current_round: Option<String>,
    pub current_round_label: String,
    pub sort_key: i64,
}

pub async fn load_pipeline(
    store: &dyn PipelineStore,
    settings: &PipelineSettings,
    application_id: Uuid,
) -> Result<Pipeline, PipelineError> {
    let raw = store.get_pipeline(application_id).await?;
    settings.parse_pipeline(&raw)
}

pub async fn save_round(
    store: &dyn PipelineStore,
    settings: &PipelineSettings,
    application_id: Uuid,
    round: &str,
    patch: RoundPatch,
    today: NaiveDate,
) -> Result<SaveOutcome, PipelineError> {
    let index = settings.require_round(round)?;
    let rounds = settings.ordered_rounds();

    // A patch that sets a non-completed status or a non-passing outcome can
    // never leave the round passed, so it is a plain keyed merge.
    let may_pass = patch.status.map_or(true, |s| s == RoundStatus::Completed)
        && patch.outcome.map_or(true, |o| o == RoundOutcome::Passed);

    let plan = |stored: &Value| -> Result<Vec<(String, RoundPatch)>, PipelineError> {
        let before = settings.parse_pipeline(stored)?;
        let updated = before.record(round).merged(&patch);
        let mut updates = vec![(round.to_string(), patch.clone())];
        if let Some(next) = on_round_saved(rounds, &before, round, &updated, today) {
            updates.push((next.round, next.patch));
        }
        Ok(updates)
    };

    let written = if may_pass {
        store
            .write_planned(application_id, &plan)
            .await
            .map(|w| (w.pipeline, w.rounds.into_iter().find(|r| r != round)))
    } else {
        store
            .upsert_round(application_id, round, &patch)
            .await
            .map(|raw| (raw, None))
    };

    let (raw, auto_advanced) = written.map_err(|e| {
        error!("Round save failed for application {application_id}: {e}");
        match e {
            PipelineError::Persistence(msg) => PipelineError::Persistence(format!(
                "saving '{round}' failed and no round was written: {msg}"
            )),
            other => other,
        }
    })?;
    let pipeline = settings.parse_pipeline(&raw)?;

    info!(
        "Saved round '{round}' for application {application_id} (state: {:?})",
        resolve_state(rounds, &pipeline, index)
    );
    if let Some(next) = &auto_advanced {
        info!("Auto-advanced application {application_id} to '{next}'");
    }

    Ok(SaveOutcome {
        pipeline,
        auto_advanced,
    })
}

/// A user's applications ordered for the table view.
pub async fn list_applications(
    store: &dyn PipelineStore,
    settings: &PipelineSettings,
    user_id: Uuid,
) -> Result<Vec<ApplicationListItem>, PipelineError> {
    let rounds = settings.ordered_rounds();
    let mut items = store
        .list_applications(user_id)
        .await?
        .into_iter()
        .map(|row| -> Result<ApplicationListItem, PipelineError> {
            let raw = row.interview_pipeline.unwrap_or(Value::Null);
            let pipeline = settings.parse_pipeline(&raw)?;
            let summary = summarize(rounds, &pipeline);
            Ok(ApplicationListItem {
                id: row.id,
                company: row.company,
                position: row.position,
                date_applied: row.date_applied,
                current_round: summary.current_round,
                current_round_label: summary.current_round_label,
                sort_key: summary.sort_key,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    items.sort_by(|a, b| {
        compare_entries(a.sort_key, a.date_applied, b.sort_key, b.date_applied)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::models::application::ApplicationPipelineRow;
    use crate::pipeline::store::fixtures::application;
    use crate::pipeline::store::{MemoryPipelineStore, PlannedWrite, WritePlan};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn passed_patch() -> RoundPatch {
        RoundPatch {
            status: Some(RoundStatus::Completed),
            outcome: Some(RoundOutcome::Passed),
            ..RoundPatch::default()
        }
    }

    async fn store_with(pipeline: Option<Value>) -> (MemoryPipelineStore, Uuid) {
        let store = MemoryPipelineStore::new();
        let row = application(Uuid::new_v4(), "Acme", pipeline);
        let id = row.id;
        store.insert_application(row).await;
        (store, id)
    }

    /// Reads succeed, every write fails.
    struct ReadOnlyStore(MemoryPipelineStore);

    #[async_trait]
    impl PipelineStore for ReadOnlyStore {
        async fn get_pipeline(&self, id: Uuid) -> Result<Value, PipelineError> {
            self.0.get_pipeline(id).await
        }

        async fn write_planned(
            &self,
            _id: Uuid,
            _plan: &WritePlan<'_>,
        ) -> Result<PlannedWrite, PipelineError> {
            Err(PipelineError::Persistence("connection reset".to_string()))
        }

        async fn list_applications(
            &self,
            user_id: Uuid,
        ) -> Result<Vec<ApplicationPipelineRow>, PipelineError> {
            self.0.list_applications(user_id).await
        }
    }

    /// Another session puts `technical` on hold right before each write takes the lock.
    struct ConcurrentEditStore(MemoryPipelineStore);

    #[async_trait]
    impl PipelineStore for ConcurrentEditStore {
        async fn get_pipeline(&self, id: Uuid) -> Result<Value, PipelineError> {
            self.0.get_pipeline(id).await
        }

        async fn write_planned(
            &self,
            id: Uuid,
            plan: &WritePlan<'_>,
        ) -> Result<PlannedWrite, PipelineError> {
            let hold = RoundPatch {
                status: Some(RoundStatus::OnHold),
                ..RoundPatch::default()
            };
            self.0.upsert_round(id, "technical", &hold).await?;
            self.0.write_planned(id, plan).await
        }

        async fn list_applications(
            &self,
            user_id: Uuid,
        ) -> Result<Vec<ApplicationPipelineRow>, PipelineError> {
            self.0.list_applications(user_id).await
        }
    }

    #[tokio::test]
    async fn test_passing_save_schedules_next_round() {
        let (store, id) = store_with(None).await;
        let settings = PipelineSettings::default();

        let outcome = save_round(&store, &settings, id, "phone_screen", passed_patch(), today())
            .await
            .unwrap();

        assert_eq!(outcome.auto_advanced.as_deref(), Some("technical"));
        let technical = outcome.pipeline.record("technical");
        assert_eq!(technical.status, RoundStatus::Scheduled);
        assert_eq!(technical.outcome, RoundOutcome::Pending);
        assert_eq!(technical.date.as_deref(), Some("2024-06-03"));

        let stored = store.get_pipeline(id).await.unwrap();
        assert_eq!(stored["technical"]["status"], "scheduled");
    }

    #[tokio::test]
    async fn test_repeated_save_does_not_advance_again() {
        let (store, id) = store_with(None).await;
        let settings = PipelineSettings::default();

        save_round(&store, &settings, id, "phone_screen", passed_patch(), today())
            .await
            .unwrap();
        let second = save_round(&store, &settings, id, "phone_screen", passed_patch(), today())
            .await
            .unwrap();
        assert!(second.auto_advanced.is_none());
    }

    #[tokio::test]
    async fn test_outcome_only_patch_merges_with_stored_status() {
        let (store, id) = store_with(Some(json!({
            "phone_screen": {"status": "completed", "interviewer": "Kim"}
        })))
        .await;
        let settings = PipelineSettings::default();

        let patch = RoundPatch {
            outcome: Some(RoundOutcome::Passed),
            ..RoundPatch::default()
        };
        let outcome = save_round(&store, &settings, id, "phone_screen", patch, today())
            .await
            .unwrap();

        assert_eq!(outcome.auto_advanced.as_deref(), Some("technical"));
        assert_eq!(
            outcome.pipeline.record("phone_screen").interviewer.as_deref(),
            Some("Kim")
        );
    }

    #[tokio::test]
    async fn test_failed_write_is_one_failed_save() {
        let (inner, id) = store_with(None).await;
        let store = ReadOnlyStore(inner);
        let settings = PipelineSettings::default();

        let err = save_round(&store, &settings, id, "phone_screen", passed_patch(), today())
            .await
            .unwrap_err();
        match err {
            PipelineError::Persistence(msg) => {
                assert!(msg.contains("phone_screen"));
                assert!(msg.contains("no round was written"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.get_pipeline(id).await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_advance_respects_edit_made_before_lock() {
        let (inner, id) = store_with(None).await;
        let store = ConcurrentEditStore(inner);
        let settings = PipelineSettings::default();

        let outcome = save_round(&store, &settings, id, "phone_screen", passed_patch(), today())
            .await
            .unwrap();

        assert!(outcome.auto_advanced.is_none());
        assert!(outcome.pipeline.record("phone_screen").is_passed());
        assert_eq!(outcome.pipeline.record("technical").status, RoundStatus::OnHold);
        assert_eq!(outcome.pipeline.record("technical").date, None);
    }

    #[tokio::test]
    async fn test_non_passing_save_never_advances() {
        let (store, id) = store_with(Some(json!({
            "phone_screen": {"status": "completed", "outcome": "passed"}
        })))
        .await;
        let settings = PipelineSettings::default();

        let patch = RoundPatch {
            notes: Some("recruiter called back".to_string()),
            status: Some(RoundStatus::OnHold),
            ..RoundPatch::default()
        };
        let outcome = save_round(&store, &settings, id, "phone_screen", patch, today())
            .await
            .unwrap();

        assert!(outcome.auto_advanced.is_none());
        let stored = store.get_pipeline(id).await.unwrap();
        assert_eq!(stored["phone_screen"]["status"], "on_hold");
        assert_eq!(stored["phone_screen"]["outcome"], "passed");
        assert!(stored.get("technical").is_none());
    }

    #[tokio::test]
    async fn test_unknown_round_rejected_before_write() {
        let (store, id) = store_with(None).await;
        let err = save_round(
            &store,
            &PipelineSettings::default(),
            id,
            "take_home",
            passed_patch(),
            today(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert_eq!(store.get_pipeline(id).await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_corrupt_stored_pipeline_is_surfaced() {
        let (store, id) = store_with(Some(json!({"technical": {"status": "ghosted"}}))).await;
        let err = load_pipeline(&store, &PipelineSettings::default(), id)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_list_orders_by_progress_then_date() {
        let store = MemoryPipelineStore::new();
        let user = Uuid::new_v4();

        let mut fresh = application(user, "Fresh", None);
        fresh.date_applied = NaiveDate::from_ymd_opt(2024, 5, 1);
        let mut mid_old = application(
            user,
            "MidOld",
            Some(json!({"phone_screen": {"status": "completed", "outcome": "passed"}})),
        );
        mid_old.date_applied = NaiveDate::from_ymd_opt(2024, 1, 1);
        let mut mid_new = application(
            user,
            "MidNew",
            Some(json!({"phone_screen": {"status": "completed", "outcome": "passed"}})),
        );
        mid_new.date_applied = NaiveDate::from_ymd_opt(2024, 4, 1);
        let done = application(
            user,
            "Done",
            Some(json!({"final_round": {"status": "completed", "outcome": "passed"}})),
        );
        for row in [done, mid_old, fresh, mid_new] {
            store.insert_application(row).await;
        }

        let items = list_applications(&store, &PipelineSettings::default(), user)
            .await
            .unwrap();
        let order: Vec<_> = items.iter().map(|i| i.company.as_str()).collect();
        assert_eq!(order, ["Fresh", "MidNew", "MidOld", "Done"]);
        assert_eq!(items[0].current_round_label, "Not Started");
        assert_eq!(items[1].current_round_label, "Technical");
        assert_eq!(items[3].current_round_label, "Complete");
        assert_eq!(items[3].sort_key, 6);
    }
}
