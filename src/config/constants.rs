// Project-wide constants
//
// Centralised here so ports, paths and timing floors have one
// source of truth. Import via `use crate::config::constants::*;`.

/// Default bind address for the HTTP API (localhost only).
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8000";

/// Config file location, relative to the project root.
pub const CONFIG_RELATIVE_PATH: &str = "config/overthinker.toml";

/// Default OpenAI-compatible endpoint when `api_base` is unset.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com";

/// Default Ollama endpoint when `api_base` is unset.
///
/// Points at the Docker host so the service works from inside a container.
pub const DEFAULT_OLLAMA_BASE: &str = "http://host.docker.internal:11434";

/// Environment variable consulted for the API key when `api_key_env` is unset.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Ceiling on a single LLM request.
pub const LLM_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Autopilot never polls more often than this, whatever the config says.
pub const MIN_POLL_MINUTES: u64 = 5;

/// Upper bound on `poll_minutes` (one week).
pub const MAX_POLL_MINUTES: u64 = 7 * 24 * 60;

/// Quiet window used when `quiet_hours` cannot be parsed.
pub const DEFAULT_QUIET_HOURS: &str = "02:00-04:00";
