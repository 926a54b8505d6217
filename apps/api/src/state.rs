use std::sync::Arc;

use crate::pipeline::{PipelineSettings, PipelineStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Round order and vocabularies, validated once at startup.
    pub settings: Arc<PipelineSettings>,
    /// Pluggable pipeline persistence. Default: Postgres via `PgPipelineStore`.
    pub store: Arc<dyn PipelineStore>,
}
