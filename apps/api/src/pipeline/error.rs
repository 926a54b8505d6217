use thiserror::Error;
use uuid::Uuid;

/// Errors raised at the pipeline boundary. Derivation itself never fails:
/// anything malformed is rejected here before it reaches the resolver.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline configuration error: {0}")]
    Configuration(String),

    #[error("Invalid {field} '{value}' for round '{round}'")]
    InvalidState {
        round: String,
        field: &'static str,
        value: String,
    },

    #[error("Application {0} not found")]
    ApplicationNotFound(Uuid),

    #[error("Pipeline persistence failed: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for PipelineError {
    fn from(e: sqlx::Error) -> Self {
        PipelineError::Persistence(e.to_string())
    }
}

impl PipelineError {
    pub fn invalid(round: &str, field: &'static str, value: impl Into<String>) -> Self {
        PipelineError::InvalidState {
            round: round.to_string(),
            field,
            value: value.into(),
        }
    }
}
