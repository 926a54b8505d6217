//! Pipeline settings: the ordered round sequence and the status/outcome
//! vocabularies an installation accepts.
//!
//! Settings are passed into every engine call; there is no global round list.
//! This module is also the validation boundary: stored pipelines and incoming
//! round updates are checked here so the resolver only ever sees typed values.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::Config;
use crate::pipeline::error::PipelineError;
use crate::pipeline::model::{Pipeline, RoundOutcome, RoundPatch, RoundRecord, RoundStatus};

pub const DEFAULT_ROUNDS: &[&str] = &[
    "phone_screen",
    "technical",
    "panel",
    "manager",
    "culture_fit",
    "final_round",
];

/// Statuses and outcomes the engine itself writes or defaults to. A vocabulary
/// without them would make absent rounds or auto-advance produce invalid data.
const REQUIRED_STATUSES: &[RoundStatus] = &[RoundStatus::NotStarted, RoundStatus::Scheduled];
const REQUIRED_OUTCOMES: &[RoundOutcome] = &[RoundOutcome::Pending];

const PAYLOAD_FIELDS: &[&str] = &["date", "time", "location", "interviewer", "notes"];

/// Wire shape of the settings document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    pub ordered_rounds: Vec<String>,
    #[serde(default)]
    pub allowed_statuses: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_outcomes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SettingsDocument")]
pub struct PipelineSettings {
    ordered_rounds: Vec<String>,
    allowed_statuses: Vec<RoundStatus>,
    allowed_outcomes: Vec<RoundOutcome>,
}

impl TryFrom<SettingsDocument> for PipelineSettings {
    type Error = PipelineError;

    fn try_from(doc: SettingsDocument) -> Result<Self, Self::Error> {
        let statuses = doc
            .allowed_statuses
            .unwrap_or_else(|| RoundStatus::ALL.iter().map(|s| s.to_string()).collect());
        let outcomes = doc
            .allowed_outcomes
            .unwrap_or_else(|| RoundOutcome::ALL.iter().map(|o| o.to_string()).collect());
        PipelineSettings::new(doc.ordered_rounds, &statuses, &outcomes)
    }
}

/// Incoming round update with status/outcome still as raw strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoundUpdate {
    pub status: Option<String>,
    pub outcome: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub interviewer: Option<String>,
    pub notes: Option<String>,
}

impl PipelineSettings {
    pub fn new(
        ordered_rounds: Vec<String>,
        allowed_statuses: &[String],
        allowed_outcomes: &[String],
    ) -> Result<Self, PipelineError> {
        if ordered_rounds.is_empty() {
            return Err(PipelineError::Configuration(
                "orderedRounds must contain at least one round".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for round in &ordered_rounds {
            if round.trim().is_empty() {
                return Err(PipelineError::Configuration(
                    "round names cannot be blank".to_string(),
                ));
            }
            if !seen.insert(round.as_str()) {
                return Err(PipelineError::Configuration(format!(
                    "round '{round}' appears more than once in orderedRounds"
                )));
            }
        }

        let allowed_statuses = allowed_statuses
            .iter()
            .map(|s| {
                s.parse::<RoundStatus>().map_err(|_| {
                    PipelineError::Configuration(format!("unknown status '{s}' in allowedStatuses"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let allowed_outcomes = allowed_outcomes
            .iter()
            .map(|o| {
                o.parse::<RoundOutcome>().map_err(|_| {
                    PipelineError::Configuration(format!("unknown outcome '{o}' in allowedOutcomes"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(missing) = REQUIRED_STATUSES
            .iter()
            .find(|s| !allowed_statuses.contains(*s))
        {
            return Err(PipelineError::Configuration(format!(
                "allowedStatuses must include '{missing}'"
            )));
        }
        if let Some(missing) = REQUIRED_OUTCOMES
            .iter()
            .find(|o| !allowed_outcomes.contains(*o))
        {
            return Err(PipelineError::Configuration(format!(
                "allowedOutcomes must include '{missing}'"
            )));
        }

        Ok(PipelineSettings {
            ordered_rounds,
            allowed_statuses,
            allowed_outcomes,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        PipelineSettings::new(
            config.pipeline_rounds.clone(),
            &config.pipeline_allowed_statuses,
            &config.pipeline_allowed_outcomes,
        )
    }

    pub fn ordered_rounds(&self) -> &[String] {
        &self.ordered_rounds
    }

    pub fn allowed_statuses(&self) -> &[RoundStatus] {
        &self.allowed_statuses
    }

    pub fn allowed_outcomes(&self) -> &[RoundOutcome] {
        &self.allowed_outcomes
    }

    /// Index of a round that is about to be written. Writes to rounds outside
    /// the configured order are a configuration error; reads just ignore them.
    pub fn require_round(&self, round: &str) -> Result<usize, PipelineError> {
        self.ordered_rounds
            .iter()
            .position(|r| r == round)
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "round '{round}' is not part of the configured pipeline"
                ))
            })
    }

    pub fn parse_status(&self, round: &str, value: &str) -> Result<RoundStatus, PipelineError> {
        value
            .parse::<RoundStatus>()
            .ok()
            .filter(|s| self.allowed_statuses.contains(s))
            .ok_or_else(|| PipelineError::invalid(round, "status", value))
    }

    pub fn parse_outcome(&self, round: &str, value: &str) -> Result<RoundOutcome, PipelineError> {
        value
            .parse::<RoundOutcome>()
            .ok()
            .filter(|o| self.allowed_outcomes.contains(o))
            .ok_or_else(|| PipelineError::invalid(round, "outcome", value))
    }

    /// Validates a round update against this vocabulary.
    pub fn validate_update(
        &self,
        round: &str,
        update: RoundUpdate,
    ) -> Result<RoundPatch, PipelineError> {
        self.require_round(round)?;
        let status = update
            .status
            .as_deref()
            .map(|s| self.parse_status(round, s))
            .transpose()?;
        let outcome = update
            .outcome
            .as_deref()
            .map(|o| self.parse_outcome(round, o))
            .transpose()?;

        Ok(RoundPatch {
            status,
            outcome,
            date: update.date,
            time: update.time,
            location: update.location,
            interviewer: update.interviewer,
            notes: update.notes,
        })
    }

    /// Parses a stored `interview_pipeline` document. `null` is an empty
    /// pipeline. Rounds outside the configured order are inert: kept when they
    /// parse, dropped with a warning when they don't, never an error.
    pub fn parse_pipeline(&self, raw: &Value) -> Result<Pipeline, PipelineError> {
        let entries = match raw {
            Value::Null => return Ok(Pipeline::new()),
            Value::Object(entries) => entries,
            other => {
                return Err(PipelineError::invalid(
                    "*",
                    "pipeline",
                    other.to_string(),
                ))
            }
        };

        let mut pipeline = Pipeline::new();
        for (round, value) in entries {
            let parsed = match value {
                Value::Object(fields) => self.parse_record(round, fields),
                other => Err(PipelineError::invalid(round, "record", other.to_string())),
            };
            if self.ordered_rounds.iter().any(|r| r == round) {
                pipeline.insert(round.clone(), parsed?);
                continue;
            }
            match parsed {
                Ok(record) => {
                    warn!("Ignoring unconfigured round '{round}' in stored pipeline");
                    pipeline.insert(round.clone(), record);
                }
                Err(e) => warn!("Skipping unconfigured round '{round}' in stored pipeline: {e}"),
            }
        }
        Ok(pipeline)
    }

    fn parse_record(
        &self,
        round: &str,
        fields: &Map<String, Value>,
    ) -> Result<RoundRecord, PipelineError> {
        let status = match fields.get("status") {
            None | Some(Value::Null) => RoundStatus::NotStarted,
            Some(Value::String(s)) => self.parse_status(round, s)?,
            Some(other) => return Err(PipelineError::invalid(round, "status", other.to_string())),
        };
        let outcome = match fields.get("outcome") {
            None | Some(Value::Null) => RoundOutcome::Pending,
            Some(Value::String(o)) => self.parse_outcome(round, o)?,
            Some(other) => {
                return Err(PipelineError::invalid(round, "outcome", other.to_string()))
            }
        };

        let mut payload: [Option<String>; 5] = Default::default();
        for (slot, &field) in payload.iter_mut().zip(PAYLOAD_FIELDS) {
            *slot = match fields.get(field) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => {
                    return Err(PipelineError::invalid(round, field, other.to_string()))
                }
            };
        }
        let [date, time, location, interviewer, notes] = payload;

        Ok(RoundRecord {
            status,
            outcome,
            date,
            time,
            location,
            interviewer,
            notes,
        })
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            ordered_rounds: DEFAULT_ROUNDS.iter().map(|r| r.to_string()).collect(),
            allowed_statuses: RoundStatus::ALL.to_vec(),
            allowed_outcomes: RoundOutcome::ALL.to_vec(),
        }
    }
}
