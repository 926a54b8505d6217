use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Status / outcome vocabularies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    #[default]
    NotStarted,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
    OnHold,
}

impl RoundStatus {
    pub const ALL: [RoundStatus; 7] = [
        RoundStatus::NotStarted,
        RoundStatus::Scheduled,
        RoundStatus::InProgress,
        RoundStatus::Completed,
        RoundStatus::Cancelled,
        RoundStatus::Rescheduled,
        RoundStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::NotStarted => "not_started",
            RoundStatus::Scheduled => "scheduled",
            RoundStatus::InProgress => "in_progress",
            RoundStatus::Completed => "completed",
            RoundStatus::Cancelled => "cancelled",
            RoundStatus::Rescheduled => "rescheduled",
            RoundStatus::OnHold => "on_hold",
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoundStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    #[default]
    Pending,
    Passed,
    Failed,
    NeedsFollowUp,
}

impl RoundOutcome {
    pub const ALL: [RoundOutcome; 4] = [
        RoundOutcome::Pending,
        RoundOutcome::Passed,
        RoundOutcome::Failed,
        RoundOutcome::NeedsFollowUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundOutcome::Pending => "pending",
            RoundOutcome::Passed => "passed",
            RoundOutcome::Failed => "failed",
            RoundOutcome::NeedsFollowUp => "needs_follow_up",
        }
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundOutcome {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoundOutcome::ALL
            .into_iter()
            .find(|outcome| outcome.as_str() == s)
            .ok_or(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Round records
// ────────────────────────────────────────────────────────────────────────────

/// One round's stored state. Everything besides `status` and `outcome` is
/// scheduling payload that progression logic never looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    #[serde(default)]
    pub status: RoundStatus,
    #[serde(default)]
    pub outcome: RoundOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

static NOT_STARTED: RoundRecord = RoundRecord::not_started();

impl RoundRecord {
    pub const fn not_started() -> Self {
        RoundRecord {
            status: RoundStatus::NotStarted,
            outcome: RoundOutcome::Pending,
            date: None,
            time: None,
            location: None,
            interviewer: None,
            notes: None,
        }
    }

    /// Completed with a passing outcome.
    pub fn is_passed(&self) -> bool {
        self.status == RoundStatus::Completed && self.outcome == RoundOutcome::Passed
    }

    /// Completed with a failing outcome. Outcome is ignored for any other status.
    pub fn is_failed(&self) -> bool {
        self.status == RoundStatus::Completed && self.outcome == RoundOutcome::Failed
    }

    /// Returns a copy of this record with every field present in `patch` overwritten.
    pub fn merged(&self, patch: &RoundPatch) -> RoundRecord {
        RoundRecord {
            status: patch.status.unwrap_or(self.status),
            outcome: patch.outcome.unwrap_or(self.outcome),
            date: patch.date.clone().or_else(|| self.date.clone()),
            time: patch.time.clone().or_else(|| self.time.clone()),
            location: patch.location.clone().or_else(|| self.location.clone()),
            interviewer: patch
                .interviewer
                .clone()
                .or_else(|| self.interviewer.clone()),
            notes: patch.notes.clone().or_else(|| self.notes.clone()),
        }
    }
}

/// A partial round update. Serializes only the fields that are set, so the
/// JSON form can be merged key-by-key into a stored record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RoundStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RoundOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RoundPatch {
    pub fn is_empty(&self) -> bool {
        *self == RoundPatch::default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Sparse map of round name → record. A round missing from the map reads as
/// not started; the configured round order, not map order, drives progression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline(BTreeMap<String, RoundRecord>);

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored record for `round`, or the implicit not-started record.
    pub fn record(&self, round: &str) -> &RoundRecord {
        self.0.get(round).unwrap_or(&NOT_STARTED)
    }

    pub fn insert(&mut self, round: impl Into<String>, record: RoundRecord) {
        self.0.insert(round.into(), record);
    }

    #[cfg(test)]
    pub fn apply(&mut self, round: &str, patch: &RoundPatch) {
        let merged = self.record(round).merged(patch);
        self.0.insert(round.to_string(), merged);
    }

    pub fn contains(&self, round: &str) -> bool {
        self.0.contains_key(round)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, RoundRecord)> for Pipeline {
    fn from_iter<I: IntoIterator<Item = (String, RoundRecord)>>(iter: I) -> Self {
        Pipeline(iter.into_iter().collect())
    }
}

/// Index of `round` within the configured order.
pub fn round_index(ordered_rounds: &[String], round: &str) -> Option<usize> {
    ordered_rounds.iter().position(|r| r == round)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_round_reads_as_not_started() {
        let p = Pipeline::new();
        let rec = p.record("technical");
        assert_eq!(rec.status, RoundStatus::NotStarted);
        assert_eq!(rec.outcome, RoundOutcome::Pending);
        assert!(!p.contains("technical"));
    }

    #[test]
    fn test_missing_outcome_defaults_to_pending() {
        let rec: RoundRecord = serde_json::from_value(json!({"status": "scheduled"})).unwrap();
        assert_eq!(rec.status, RoundStatus::Scheduled);
        assert_eq!(rec.outcome, RoundOutcome::Pending);
    }

    #[test]
    fn test_outcome_ignored_unless_completed() {
        let rec = fixtures::record(RoundStatus::Scheduled, RoundOutcome::Passed);
        assert!(!rec.is_passed());
        let rec = fixtures::record(RoundStatus::OnHold, RoundOutcome::Failed);
        assert!(!rec.is_failed());
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let rec = RoundRecord {
            status: RoundStatus::Scheduled,
            date: Some("2024-05-01".to_string()),
            interviewer: Some("Dana".to_string()),
            ..RoundRecord::default()
        };
        let patch = RoundPatch {
            status: Some(RoundStatus::Completed),
            outcome: Some(RoundOutcome::Passed),
            ..RoundPatch::default()
        };
        let merged = rec.merged(&patch);
        assert!(merged.is_passed());
        assert_eq!(merged.date.as_deref(), Some("2024-05-01"));
        assert_eq!(merged.interviewer.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_patch_json_only_carries_set_fields() {
        let patch = RoundPatch {
            status: Some(RoundStatus::InProgress),
            notes: Some("bring laptop".to_string()),
            ..RoundPatch::default()
        };
        assert_eq!(
            patch.to_json(),
            json!({"status": "in_progress", "notes": "bring laptop"})
        );
        assert!(RoundPatch::default().is_empty());
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in RoundStatus::ALL {
            assert_eq!(status.as_str().parse::<RoundStatus>(), Ok(status));
        }
        assert!("interviewing".parse::<RoundStatus>().is_err());
        assert_eq!("needs_follow_up".parse::<RoundOutcome>(), Ok(RoundOutcome::NeedsFollowUp));
    }
}
