//! State Resolver: derives each round's timeline state from the stored
//! status/outcome pairs.
//!
//! Skip-ahead: a later round that passed marks every earlier round complete,
//! since the candidate evidently got past them. Fail-stop: scanning forward,
//! a failed round reached before any pass blocks that inference.

use serde::{Deserialize, Serialize};

use crate::pipeline::model::{Pipeline, RoundStatus};
use crate::pipeline::selector::current_round;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Complete,
    Active,
    Failed,
    Incomplete,
}

/// The "Applied" pseudo-round that heads every timeline. It has no record.
pub fn applied_state() -> NodeState {
    NodeState::Complete
}

/// State of a single round. Panics if `index` is out of range for `ordered_rounds`.
pub fn resolve_state(ordered_rounds: &[String], pipeline: &Pipeline, index: usize) -> NodeState {
    let current = current_round(ordered_rounds, pipeline);
    resolve_with_current(ordered_rounds, pipeline, index, current)
}

/// States for every configured round, in order. `current` is what
/// `current_round` returned for the same pipeline.
pub fn resolve_states(
    ordered_rounds: &[String],
    pipeline: &Pipeline,
    current: Option<usize>,
) -> Vec<NodeState> {
    (0..ordered_rounds.len())
        .map(|i| resolve_with_current(ordered_rounds, pipeline, i, current))
        .collect()
}

fn resolve_with_current(
    ordered_rounds: &[String],
    pipeline: &Pipeline,
    index: usize,
    current: Option<usize>,
) -> NodeState {
    let record = pipeline.record(&ordered_rounds[index]);

    if record.is_failed() {
        return NodeState::Failed;
    }
    if is_implicitly_complete(ordered_rounds, pipeline, index) {
        return NodeState::Complete;
    }
    if matches!(
        record.status,
        RoundStatus::Scheduled | RoundStatus::InProgress
    ) || current == Some(index)
    {
        return NodeState::Active;
    }
    NodeState::Incomplete
}

/// True when the round passed itself, or when the first decisive round after
/// it (passed or failed, in configured order) is a pass.
pub fn is_implicitly_complete(ordered_rounds: &[String], pipeline: &Pipeline, index: usize) -> bool {
    if pipeline.record(&ordered_rounds[index]).is_passed() {
        return true;
    }
    for round in &ordered_rounds[index + 1..] {
        let record = pipeline.record(round);
        if record.is_failed() {
            return false;
        }
        if record.is_passed() {
            return true;
        }
    }
    false
}
