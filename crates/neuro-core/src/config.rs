//! Agent configuration: API credentials, model selection, and validation toggles.
//!
//! Built once per process and injected into the orchestrator and providers; nothing reads
//! credentials from ambient state after construction.

use crate::error::{DiagnoseError, DiagnoseResult};
use crate::validator::ContractValidator;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "gpt-4o-transcribe-diarize";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 15;

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_transcription_model() -> String {
    DEFAULT_TRANSCRIPTION_MODEL.to_string()
}

fn default_max_tool_rounds() -> usize {
    DEFAULT_MAX_TOOL_ROUNDS
}

fn default_probability_tolerance() -> f64 {
    0.05
}

fn default_chat_timeout_secs() -> u64 {
    60
}

fn default_transcription_timeout_secs() -> u64 {
    120
}

/// Agent configuration.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | NEURO_LLM_API_KEY / OPENAI_API_KEY | (none) | Bearer key for chat and transcription. |
/// | NEURO_LLM_API_URL | https://api.openai.com/v1 | OpenAI-compatible base URL. |
/// | NEURO_LLM_MODEL | gpt-4.1-nano | Chat model driving tool calls. |
/// | NEURO_STT_MODEL | gpt-4o-transcribe-diarize | Diarized transcription model. |
/// | NEURO_LLM_TEMPERATURE | 0.0 | Sampling temperature. |
/// | NEURO_MAX_TOOL_ROUNDS | 15 | Model turns allowed before giving up. |
/// | NEURO_JSON_MODE | false | Ask the model for `response_format: json_object`. |
/// | NEURO_STRICT_VALIDATION | true | Run the typed contract check after the key check. |
/// | NEURO_PROBABILITY_TOLERANCE | 0.05 | Allowed distance of sum(accuracy) from 1.0. |
/// | NEURO_RISK_POLICY | built-in | Probability → risk mapping policy text for the prompt. |
/// | NEURO_MAX_AUDIO_BYTES | 25 MiB | Largest audio file or download accepted. |
/// | NEURO_AUDIO_ROOT | (none) | If set, local audio paths must resolve under this directory. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_api_base")]
    pub api_base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default)]
    pub json_mode: bool,
    #[serde(default = "default_true")]
    pub strict_validation: bool,
    #[serde(default = "default_probability_tolerance")]
    pub probability_tolerance: f64,
    #[serde(default = "default_chat_timeout_secs")]
    pub chat_timeout_secs: u64,
    #[serde(default = "default_transcription_timeout_secs")]
    pub transcription_timeout_secs: u64,
    /// Overrides the built-in risk mapping policy in the task prompt.
    #[serde(default)]
    pub risk_policy: Option<String>,
    /// Audio size cap; `None` keeps the loader default.
    #[serde(default)]
    pub max_audio_bytes: Option<u64>,
    #[serde(default)]
    pub audio_root: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base(),
            api_key: None,
            chat_model: default_chat_model(),
            transcription_model: default_transcription_model(),
            temperature: 0.0,
            max_tool_rounds: default_max_tool_rounds(),
            json_mode: false,
            strict_validation: true,
            probability_tolerance: default_probability_tolerance(),
            chat_timeout_secs: default_chat_timeout_secs(),
            transcription_timeout_secs: default_transcription_timeout_secs(),
            risk_policy: None,
            max_audio_bytes: None,
            audio_root: None,
        }
    }
}

impl AgentConfig {
    /// Load from environment. Unset or invalid values fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env_opt_string("NEURO_LLM_API_URL").unwrap_or(defaults.api_base_url),
            api_key: env_api_key(),
            chat_model: env_opt_string("NEURO_LLM_MODEL").unwrap_or(defaults.chat_model),
            transcription_model: env_opt_string("NEURO_STT_MODEL")
                .unwrap_or(defaults.transcription_model),
            temperature: env_parse("NEURO_LLM_TEMPERATURE", defaults.temperature).clamp(0.0, 2.0),
            max_tool_rounds: env_parse("NEURO_MAX_TOOL_ROUNDS", defaults.max_tool_rounds).max(1),
            json_mode: env_bool("NEURO_JSON_MODE", defaults.json_mode),
            strict_validation: env_bool("NEURO_STRICT_VALIDATION", defaults.strict_validation),
            probability_tolerance: Some(env_parse(
                "NEURO_PROBABILITY_TOLERANCE",
                defaults.probability_tolerance,
            ))
            .filter(|t| valid_tolerance(*t))
            .unwrap_or(defaults.probability_tolerance),
            chat_timeout_secs: env_parse("NEURO_CHAT_TIMEOUT_SECS", defaults.chat_timeout_secs),
            transcription_timeout_secs: env_parse(
                "NEURO_STT_TIMEOUT_SECS",
                defaults.transcription_timeout_secs,
            ),
            risk_policy: env_opt_string("NEURO_RISK_POLICY"),
            max_audio_bytes: env_opt_string("NEURO_MAX_AUDIO_BYTES").and_then(|v| v.parse().ok()),
            audio_root: env_opt_string("NEURO_AUDIO_ROOT"),
        }
    }

    /// Load from a TOML file. A missing `api_key` falls back to the environment.
    pub fn load_from_path(path: &Path) -> DiagnoseResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DiagnoseError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> DiagnoseResult<Self> {
        let mut config: AgentConfig = toml::from_str(content)
            .map_err(|e| DiagnoseError::Config(format!("invalid agent config: {}", e)))?;
        config.api_key = config
            .api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(env_api_key);
        if !valid_tolerance(config.probability_tolerance) {
            return Err(DiagnoseError::Config(format!(
                "probability_tolerance must be a finite number >= 0, got {}",
                config.probability_tolerance
            )));
        }
        Ok(config)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// API key, or a configuration error naming the variables to set.
    pub fn require_api_key(&self) -> DiagnoseResult<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                DiagnoseError::Config(
                    "no API key: set NEURO_LLM_API_KEY or OPENAI_API_KEY".to_string(),
                )
            })
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_secs)
    }

    /// Strict validator, or `None` when only the key check should run.
    pub fn contract_validator(&self) -> Option<ContractValidator> {
        self.strict_validation
            .then(|| ContractValidator::new(self.probability_tolerance))
    }
}

fn valid_tolerance(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn env_api_key() -> Option<String> {
    env_opt_string("NEURO_LLM_API_KEY").or_else(|| env_opt_string("OPENAI_API_KEY"))
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
