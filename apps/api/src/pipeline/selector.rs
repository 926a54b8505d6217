//! Current-Round Selector: the one definition of "which round needs attention".
//!
//! Badges, the timeline, list sorting and summaries all go through
//! `current_round`; nothing re-derives it locally.

use crate::pipeline::model::{Pipeline, RoundRecord, RoundStatus};
use crate::pipeline::resolver::is_implicitly_complete;

/// Index of the first round, in configured order, that still needs attention.
/// `None` means every round is complete.
///
/// A round needs attention when it is open (scheduled, in progress,
/// rescheduled), paused (cancelled, on hold), not yet reached, or completed
/// without a pass. Rounds already covered by a later pass are skipped over,
/// unless the round itself failed.
pub fn current_round(ordered_rounds: &[String], pipeline: &Pipeline) -> Option<usize> {
    ordered_rounds.iter().enumerate().position(|(i, round)| {
        let record = pipeline.record(round);
        needs_attention(record)
            && (record.is_failed() || !is_implicitly_complete(ordered_rounds, pipeline, i))
    })
}

fn needs_attention(record: &RoundRecord) -> bool {
    match record.status {
        RoundStatus::Scheduled | RoundStatus::InProgress | RoundStatus::Rescheduled => true,
        RoundStatus::Completed => !record.is_passed(),
        RoundStatus::NotStarted | RoundStatus::Cancelled | RoundStatus::OnHold => true,
    }
}
