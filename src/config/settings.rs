// Configuration structs

use serde::{Deserialize, Serialize};

use super::constants::{
    DEFAULT_API_KEY_ENV, DEFAULT_OLLAMA_BASE, DEFAULT_OPENAI_BASE, DEFAULT_QUIET_HOURS,
    MAX_POLL_MINUTES, MIN_POLL_MINUTES,
};
use crate::errors::{PlannerError, Result};

/// Which wire protocol to speak to the model endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Any OpenAI-compatible `/v1/chat/completions` endpoint
    #[default]
    Openai,
    /// Ollama's native `/api/chat` endpoint
    Ollama,
}

/// Model settings used for every iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: Provider,

    pub model_name: String,

    /// Base URL override (e.g. http://host.docker.internal:11434)
    pub api_base: Option<String>,

    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,

    pub temperature: f64,

    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Openai,
            model_name: "gpt-4.1-mini".to_string(),
            api_base: None,
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
            temperature: 0.4,
            max_tokens: 1500,
        }
    }
}

impl ModelConfig {
    /// Base URL with any trailing slash removed, falling back to the provider default.
    pub fn base_url(&self) -> String {
        let base = match (&self.api_base, self.provider) {
            (Some(base), _) if !base.trim().is_empty() => base.trim(),
            (_, Provider::Openai) => DEFAULT_OPENAI_BASE,
            (_, Provider::Ollama) => DEFAULT_OLLAMA_BASE,
        };
        base.trim_end_matches('/').to_string()
    }

    /// Resolve the API key from the configured environment variable.
    ///
    /// Returns `None` when the variable is unset or empty; the request is then
    /// sent unauthenticated and the provider decides what to do with it.
    pub fn api_key(&self) -> Option<String> {
        let var = self
            .api_key_env
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_API_KEY_ENV);
        std::env::var(var).ok().filter(|k| !k.is_empty())
    }

    fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(PlannerError::Validation("model.model_name must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(PlannerError::Validation(format!(
                "model.temperature must be between 0.0 and 2.0 (got {})",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(PlannerError::Validation("model.max_tokens must be at least 1".into()));
        }
        if let Some(base) = &self.api_base {
            let base = base.trim();
            if !base.is_empty() && !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(PlannerError::Validation(format!(
                    "model.api_base must be an http(s) URL (got '{}')",
                    base
                )));
            }
        }
        Ok(())
    }
}

/// Autopilot settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Run iterations on a timer without user involvement
    pub autopilot: bool,

    /// Minutes between autopilot batches (effective value clamped to 5..=10080)
    pub poll_minutes: u64,

    /// Scheduled iterations allowed per scope per day (0 = unlimited)
    pub rate_limit_per_day: u32,

    /// HH:MM-HH:MM window during which autopilot stays silent
    pub quiet_hours: String,

    /// Serialize iterations of the same scope (manual and scheduled alike)
    pub exclusive_runs: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            autopilot: false,
            poll_minutes: 30,
            rate_limit_per_day: 0,
            quiet_hours: DEFAULT_QUIET_HOURS.to_string(),
            exclusive_runs: false,
        }
    }
}

impl ScheduleConfig {
    /// Effective polling interval in minutes.
    pub fn interval_minutes(&self) -> u64 {
        self.poll_minutes.clamp(MIN_POLL_MINUTES, MAX_POLL_MINUTES)
    }

    /// `quiet_hours` is not checked: a malformed window falls back to the
    /// default at use time instead of rejecting the config.
    fn validate(&self) -> Result<()> {
        if self.poll_minutes > MAX_POLL_MINUTES {
            return Err(PlannerError::Validation(format!(
                "schedule.poll_minutes must be at most {} (got {})",
                MAX_POLL_MINUTES, self.poll_minutes
            )));
        }
        Ok(())
    }
}

/// Complete persisted configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlannerConfig {
    pub model: ModelConfig,
    pub schedule: ScheduleConfig,
}

impl PlannerConfig {
    /// Validate every field that has a hard constraint.
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.schedule.validate()
    }
}
