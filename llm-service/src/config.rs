//! LLM configuration, constructible directly or from the environment.

use crate::errors::{LlmServiceResult, env_opt_f32, env_opt_u64, must_env, validate_range_f32};

/// Configuration for the text-generation provider.
///
/// Environment variables (all optional except the key):
/// - `LLM_API_KEY`: provider credential; absence means "no LLM wired".
/// - `LLM_MODEL`: model identifier (default `llama3.1:8b-instruct`).
/// - `LLM_ENDPOINT`: inference endpoint (default local Ollama).
/// - `LLM_TEMPERATURE`: sampling temperature, validated to [0, 2].
/// - `LLM_TIMEOUT_SECS`: per-call timeout in seconds.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama3.1:8b-instruct".to_string(),
            endpoint: "http://127.0.0.1:11434".to_string(),
            api_key: None,
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Reads the config from the environment.
    ///
    /// # Errors
    /// Fails when `LLM_API_KEY` is absent or a numeric variable is set but
    /// invalid (temperature outside [0, 2], unparsable timeout).
    pub fn from_env() -> LlmServiceResult<Self> {
        let api_key = must_env("LLM_API_KEY")?;
        let mut cfg = Self {
            api_key: Some(api_key),
            ..Self::default()
        };
        if let Ok(model) = std::env::var("LLM_MODEL") {
            if !model.trim().is_empty() {
                cfg.model = model;
            }
        }
        if let Ok(endpoint) = std::env::var("LLM_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                cfg.endpoint = endpoint;
            }
        }
        if let Some(temperature) = env_opt_f32("LLM_TEMPERATURE")? {
            validate_range_f32("LLM_TEMPERATURE", temperature, 0.0, 2.0)?;
            cfg.temperature = temperature;
        }
        if let Some(timeout) = env_opt_u64("LLM_TIMEOUT_SECS")? {
            cfg.timeout_secs = timeout;
        }
        Ok(cfg)
    }

    /// True when a credential is present, i.e. the client may go on the
    /// wire.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_not_wire_ready() {
        let cfg = LlmConfig::default();
        assert!(!cfg.is_configured());
        assert_eq!(cfg.temperature, 0.2);
        assert_eq!(cfg.timeout_secs, 60);
    }

    #[test]
    fn temperature_validation_bounds() {
        use crate::errors::validate_range_f32;
        assert!(validate_range_f32("LLM_TEMPERATURE", 0.0, 0.0, 2.0).is_ok());
        assert!(validate_range_f32("LLM_TEMPERATURE", 2.0, 0.0, 2.0).is_ok());
        assert!(validate_range_f32("LLM_TEMPERATURE", 2.1, 0.0, 2.0).is_err());
        assert!(validate_range_f32("LLM_TEMPERATURE", f32::NAN, 0.0, 2.0).is_err());
    }
}
