// Interview pipeline progression engine.
// Implements: round data model, settings/validation boundary, state resolution,
// current-round selection, sort keys, auto-advance, and keyed persistence.
// Derived state is recomputed from the stored map on every read; nothing derived is persisted.

pub mod advance;
pub mod error;
pub mod handlers;
pub mod model;
pub mod resolver;
pub mod selector;
pub mod service;
pub mod settings;
pub mod sort_key;
pub mod store;
pub mod view;

pub use error::PipelineError;
pub use settings::PipelineSettings;
pub use store::{PgPipelineStore, PipelineStore};
