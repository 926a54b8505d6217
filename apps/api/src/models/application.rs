use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// The slice of an `applications` row the pipeline engine reads. Company and
/// position are carried for list views only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationPipelineRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub position: String,
    pub date_applied: Option<NaiveDate>,
    pub interview_pipeline: Option<Value>,
}
