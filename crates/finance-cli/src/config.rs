//! Environment configuration

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use agent_core::provider::DEFAULT_MODEL;
use agent_runtime::GroqConfig;

/// Everything the binary reads from the environment
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub groq: GroqConfig,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Option<Duration>,
    pub max_rounds: Option<usize>,
}

impl CliConfig {
    /// Read from the process environment (call `dotenvy::dotenv()` first)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let groq = GroqConfig::from_lookup(&lookup).context("Groq configuration")?;

        let model = lookup("FINAI_MODEL")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let temperature = parse_var::<f32>(&lookup, "FINAI_TEMPERATURE")?.unwrap_or(0.7);
        if !(0.0..=2.0).contains(&temperature) {
            bail!("FINAI_TEMPERATURE must be between 0 and 2, got {temperature}");
        }

        let request_timeout = parse_var::<u64>(&lookup, "FINAI_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let max_rounds = parse_var::<usize>(&lookup, "FINAI_MAX_ROUNDS")?.filter(|n| *n > 0);

        Ok(Self {
            groq,
            model,
            temperature,
            request_timeout,
            max_rounds,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        _ => Ok(None),
    }
}
