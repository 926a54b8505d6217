//! Auto-Advance Controller: when a round is saved as passed, schedule the
//! next round unless the user already touched it.
//!
//! This only computes the patch. The save service writes it in the same
//! transaction as the round that triggered it.

use chrono::NaiveDate;
use serde::Serialize;

use crate::pipeline::model::{
    round_index, Pipeline, RoundOutcome, RoundPatch, RoundRecord, RoundStatus,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvancePatch {
    pub round: String,
    pub patch: RoundPatch,
}

/// `pipeline` is the state before the save; `updated` is the saved round's
/// merged record. Returns at most one extra round update.
pub fn on_round_saved(
    ordered_rounds: &[String],
    pipeline: &Pipeline,
    saved_round: &str,
    updated: &RoundRecord,
    today: NaiveDate,
) -> Option<AdvancePatch> {
    if !updated.is_passed() {
        return None;
    }
    let index = round_index(ordered_rounds, saved_round)?;
    let next = ordered_rounds.get(index + 1)?;
    let next_record = pipeline.record(next);
    if next_record.status != RoundStatus::NotStarted {
        return None;
    }

    Some(AdvancePatch {
        round: next.clone(),
        patch: RoundPatch {
            status: Some(RoundStatus::Scheduled),
            outcome: Some(RoundOutcome::Pending),
            date: Some(
                next_record
                    .date
                    .clone()
                    .unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
            ),
            ..RoundPatch::default()
        },
    })
}
