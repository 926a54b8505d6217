use serde::Serialize;

use crate::pipeline::model::Pipeline;
use crate::pipeline::resolver::{applied_state, resolve_states, NodeState};
use crate::pipeline::selector::current_round;
use crate::pipeline::sort_key::sort_key;

pub const APPLIED_ROUND: &str = "applied";

#[derive(Debug, Clone, Serialize)]
pub struct TimelineNode {
    pub round: String,
    pub label: String,
    pub state: NodeState,
}

/// Everything a page needs to draw a pipeline, derived fresh on every read.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub timeline: Vec<TimelineNode>,
    pub current_round: Option<String>,
    pub current_round_index: Option<usize>,
    pub current_round_label: String,
    pub sort_key: i64,
    pub completed_rounds: usize,
    pub total_rounds: usize,
}

pub fn summarize(ordered_rounds: &[String], pipeline: &Pipeline) -> PipelineSummary {
    let current = current_round(ordered_rounds, pipeline);
    let states = resolve_states(ordered_rounds, pipeline, current);
    let key = sort_key(ordered_rounds, pipeline, current);

    let mut timeline = Vec::with_capacity(ordered_rounds.len() + 1);
    timeline.push(TimelineNode {
        round: APPLIED_ROUND.to_string(),
        label: round_label(APPLIED_ROUND),
        state: applied_state(),
    });
    timeline.extend(
        ordered_rounds
            .iter()
            .zip(&states)
            .map(|(round, state)| TimelineNode {
                round: round.clone(),
                label: round_label(round),
                state: *state,
            }),
    );

    let current_round_label = match current {
        _ if key < 0 => "Not Started".to_string(),
        Some(i) => round_label(&ordered_rounds[i]),
        None => "Complete".to_string(),
    };

    PipelineSummary {
        timeline,
        current_round: current.map(|i| ordered_rounds[i].clone()),
        current_round_index: current,
        current_round_label,
        sort_key: key,
        completed_rounds: states.iter().filter(|s| **s == NodeState::Complete).count(),
        total_rounds: ordered_rounds.len(),
    }
}

/// `phone_screen` → `Phone Screen`.
pub fn round_label(round: &str) -> String {
    round
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().to_string() + c.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::fixtures::*;
    use crate::pipeline::model::RoundStatus;

    #[test]
    fn test_round_label() {
        assert_eq!(round_label("phone_screen"), "Phone Screen");
        assert_eq!(round_label("final_round"), "Final Round");
        assert_eq!(round_label("applied"), "Applied");
    }

    #[test]
    fn test_summary_for_mid_progress() {
        let rounds = default_rounds();
        let p = pipeline(&[
            ("phone_screen", passed()),
            ("technical", with_status(RoundStatus::Scheduled)),
        ]);
        let summary = summarize(&rounds, &p);

        assert_eq!(summary.timeline.len(), 7);
        assert_eq!(summary.timeline[0].round, "applied");
        assert_eq!(summary.timeline[0].state, NodeState::Complete);
        assert_eq!(summary.timeline[2].state, NodeState::Active);
        assert_eq!(summary.current_round.as_deref(), Some("technical"));
        assert_eq!(summary.current_round_label, "Technical");
        assert_eq!(summary.sort_key, 1);
        assert_eq!(summary.completed_rounds, 1);
        assert_eq!(summary.total_rounds, 6);
    }

    #[test]
    fn test_summary_labels_for_empty_and_finished() {
        let rounds = default_rounds();
        let empty = summarize(&rounds, &Pipeline::new());
        assert_eq!(empty.current_round_label, "Not Started");
        assert_eq!(empty.current_round_index, Some(0));
        assert_eq!(empty.timeline[0].state, NodeState::Complete);

        let done = summarize(&rounds, &pipeline(&[("final_round", passed())]));
        assert_eq!(done.current_round_label, "Complete");
        assert_eq!(done.current_round, None);
        assert_eq!(done.completed_rounds, 6);
        assert_eq!(done.sort_key, 6);
    }

    #[test]
    fn test_failed_round_keeps_summary_open() {
        let rounds = default_rounds();
        let p = pipeline(&[("phone_screen", failed()), ("final_round", passed())]);
        let summary = summarize(&rounds, &p);
        assert_eq!(summary.timeline[1].state, NodeState::Failed);
        assert_eq!(summary.current_round.as_deref(), Some("phone_screen"));
        assert_eq!(summary.current_round_label, "Phone Screen");
        assert_eq!(summary.sort_key, 0);
        assert_eq!(summary.completed_rounds, 5);
    }
}
