//! Enum-dispatch LLM client.
//!
//! One provider today: an Ollama-style `/api/generate` endpoint called
//! non-streaming. The reqwest client carries the configured timeout, so a
//! hung provider surfaces as a transport error the caller's fallback branch
//! absorbs.

use crate::config::LlmConfig;
use crate::errors::{LlmServiceError, LlmServiceResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Strips one leading fenced code block (```json ... ```) from model
/// output. Models routinely wrap JSON answers in fences; the JSON contract
/// tolerates exactly that shape.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => return trimmed,
    };
    body.strip_suffix("```").map(str::trim).unwrap_or_else(|| body.trim())
}

/// Thin enum client for dispatch.
pub enum LlmClient {
    Http(HttpLlmClient),
}

impl LlmClient {
    /// Builds the client for a wire-ready config.
    ///
    /// # Errors
    /// [`LlmServiceError::InvalidEndpoint`] when the endpoint is empty or
    /// lacks an http/https scheme; transport errors if the HTTP client
    /// cannot be built.
    pub fn from_config(cfg: LlmConfig) -> LlmServiceResult<Self> {
        Ok(Self::Http(HttpLlmClient::new(cfg)?))
    }

    /// Generates a completion for `prompt`.
    pub async fn generate(&self, prompt: &str) -> LlmServiceResult<String> {
        match self {
            Self::Http(c) => c.generate(prompt).await,
        }
    }

    /// Generates a completion and parses it as JSON, stripping one leading
    /// fenced code block first.
    pub async fn generate_json(&self, prompt: &str) -> LlmServiceResult<serde_json::Value> {
        let raw = self.generate(prompt).await?;
        let body = strip_code_fences(&raw);
        Ok(serde_json::from_str(body)?)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Concrete HTTP provider client.
pub struct HttpLlmClient {
    client: reqwest::Client,
    cfg: LlmConfig,
    url_generate: String,
}

impl HttpLlmClient {
    pub fn new(cfg: LlmConfig) -> LlmServiceResult<Self> {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(LlmServiceError::InvalidEndpoint(cfg.endpoint.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        let url_generate = format!("{}/api/generate", endpoint.trim_end_matches('/'));

        Ok(Self {
            client,
            cfg,
            url_generate,
        })
    }

    /// Non-streaming generation via `/api/generate`.
    pub async fn generate(&self, prompt: &str) -> LlmServiceResult<String> {
        let body = GenerateRequest {
            model: &self.cfg.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.cfg.temperature,
            },
        };

        debug!("llm: POST {} model={}", self.url_generate, self.cfg.model);
        let mut request = self.client.post(&self.url_generate).json(&body);
        if let Some(key) = self.cfg.api_key.as_deref() {
            request = request.bearer_auth(key);
        }
        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let url = self.url_generate.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(240).collect::<String>();
            return Err(LlmServiceError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        let out: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmServiceError::Decode(format!("serde error: {e}")))?;
        Ok(out.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_stripping_handles_info_strings() {
        let fenced = "```json\n{\"score\": 0.8}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"score\": 0.8}");

        let bare = "{\"score\": 0.8}";
        assert_eq!(strip_code_fences(bare), bare);

        let no_close = "```json\n{\"score\": 0.8}";
        assert_eq!(strip_code_fences(no_close), "{\"score\": 0.8}");
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let cfg = LlmConfig {
            endpoint: "localhost:11434".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            HttpLlmClient::new(cfg),
            Err(LlmServiceError::InvalidEndpoint(_))
        ));

        let empty = LlmConfig {
            endpoint: "  ".to_string(),
            ..LlmConfig::default()
        };
        assert!(HttpLlmClient::new(empty).is_err());
    }
}
