use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::pipeline::model::Pipeline;

/// Sort key for an application's pipeline, ascending = earlier in the process.
///
/// -1 when no configured round has ever been touched, the current round's
/// index while in progress, and `ordered_rounds.len()` once everything is complete.
/// `current` is what `current_round` returned for the same pipeline.
pub fn sort_key(ordered_rounds: &[String], pipeline: &Pipeline, current: Option<usize>) -> i64 {
    if !ordered_rounds.iter().any(|r| pipeline.contains(r)) {
        return -1;
    }
    match current {
        Some(i) => i as i64,
        None => ordered_rounds.len() as i64,
    }
}

/// Orders by sort key, then most recently applied first. Applications with
/// no date applied sort after dated ones within the same key.
pub fn compare_entries(
    a_key: i64,
    a_applied: Option<NaiveDate>,
    b_key: i64,
    b_applied: Option<NaiveDate>,
) -> Ordering {
    a_key.cmp(&b_key).then_with(|| match (a_applied, b_applied) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}
