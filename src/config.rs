use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    /// Path to the SQLite database holding reviews.
    pub database_path: PathBuf,
    pub port: u16,
    /// Evict dialogues idle longer than this. Unset means dialogues are kept
    /// forever, matching the original system's behavior.
    pub dialogue_ttl: Option<Duration>,
    /// Origin allowed to call the read API (the presentation frontend).
    /// Unset means no CORS headers are sent.
    pub cors_allowed_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("reviews.db"));

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let dialogue_ttl = parse_ttl_secs(env::var("DIALOGUE_TTL_SECS").ok())
            .context("DIALOGUE_TTL_SECS must be a positive number of seconds")?;

        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Config {
            database_path,
            port,
            dialogue_ttl,
            cors_allowed_origin,
        })
    }
}

/// Parse DIALOGUE_TTL_SECS from an optional string value.
///
/// Returns None if the value is missing, empty, or whitespace (TTL
/// disabled). Zero is rejected: it would evict every dialogue on the first
/// sweep.
pub fn parse_ttl_secs(value: Option<String>) -> Result<Option<Duration>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let secs = trimmed
        .parse::<u64>()
        .with_context(|| format!("invalid TTL '{}'", trimmed))?;
    if secs == 0 {
        anyhow::bail!("TTL must be greater than zero");
    }
    Ok(Some(Duration::from_secs(secs)))
}
