use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// `REDIS_URL` is optional: when unset the cache layer degrades to a no-op
/// (see [`crate::cache::connect`]).
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub redis_url: Option<String>,
    /// Model alias ("haiku" | "sonnet") used when the caller does not pick one.
    pub default_model: String,
    /// Input limits enforced by the API layer before reaching this crate.
    pub max_cv_size: usize,
    pub max_job_desc_size: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            redis_url: optional_env("REDIS_URL"),
            default_model: std::env::var("AI_DEFAULT_MODEL").unwrap_or_else(|_| "haiku".to_string()),
            max_cv_size: parse_env("MAX_CV_SIZE", 100_000)?,
            max_job_desc_size: parse_env("MAX_JOB_DESC_SIZE", 50_000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env(key: &str, default: usize) -> Result<usize> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<usize>()
            .with_context(|| format!("'{key}' must be a positive integer")),
        Err(_) => Ok(default),
    }
}
