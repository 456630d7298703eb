//! Error types and validation helpers for llm-service.
//!
//! All messages carry the `[LLM Service]` prefix so bubbled-up errors can
//! be attributed to this library in logs.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type LlmServiceResult<T> = Result<T, LlmServiceError>;

/// Root error type for configuration and generation.
#[derive(Debug, Error)]
pub enum LlmServiceError {
    /// Required environment variable is missing or empty.
    #[error("[LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A numeric value failed to parse or fell outside its allowed range.
    #[error("[LLM Service] invalid value in {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        reason: &'static str,
    },

    /// Endpoint is empty or lacks an http/https scheme.
    #[error("[LLM Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Transport/HTTP client error (including per-call timeouts).
    #[error("[LLM Service] transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from the provider.
    #[error("[LLM Service] unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: u16,
        url: String,
        snippet: String,
    },

    /// Provider answered but the payload could not be decoded.
    #[error("[LLM Service] failed to decode response: {0}")]
    Decode(String),

    /// `generate_json` output was not valid JSON after fence stripping.
    #[error("[LLM Service] model returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Fetches a required, non-empty environment variable.
pub fn must_env(name: &'static str) -> LlmServiceResult<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LlmServiceError::MissingVar(name)),
    }
}

/// Parses an optional `f32` from env (`Ok(None)` if unset or empty).
pub fn env_opt_f32(name: &'static str) -> LlmServiceResult<Option<f32>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<f32>()
                .map(Some)
                .map_err(|_| LlmServiceError::InvalidValue {
                    var: name,
                    reason: "expected f32",
                })
        }
        _ => Ok(None),
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset or empty).
pub fn env_opt_u64(name: &'static str) -> LlmServiceResult<Option<u64>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<u64>()
                .map(Some)
                .map_err(|_| LlmServiceError::InvalidValue {
                    var: name,
                    reason: "expected u64",
                })
        }
        _ => Ok(None),
    }
}

/// Validates that a float lies within an inclusive range.
pub fn validate_range_f32(
    var: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> LlmServiceResult<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(LlmServiceError::InvalidValue {
            var,
            reason: "value outside inclusive range",
        })
    }
}
