use anyhow::{Context, Result};

use crate::pipeline::model::{RoundOutcome, RoundStatus};
use crate::pipeline::settings::DEFAULT_ROUNDS;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Ordered interview rounds, from `PIPELINE_ROUNDS` (comma-separated).
    pub pipeline_rounds: Vec<String>,
    pub pipeline_allowed_statuses: Vec<String>,
    pub pipeline_allowed_outcomes: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            pipeline_rounds: list_env("PIPELINE_ROUNDS", DEFAULT_ROUNDS.iter().copied()),
            pipeline_allowed_statuses: list_env(
                "PIPELINE_ALLOWED_STATUSES",
                RoundStatus::ALL.iter().map(RoundStatus::as_str),
            ),
            pipeline_allowed_outcomes: list_env(
                "PIPELINE_ALLOWED_OUTCOMES",
                RoundOutcome::ALL.iter().map(RoundOutcome::as_str),
            ),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn list_env<'a>(key: &str, default: impl Iterator<Item = &'a str>) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => split_list(&raw),
        _ => default.map(str::to_string).collect(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
