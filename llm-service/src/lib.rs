//! LLM port for the investigation brain.
//!
//! Contract: `generate(prompt) -> text` and `generate_json(prompt) -> map`,
//! where the JSON path strips one leading fenced code block before parsing.
//! The client is enum-dispatched (no async-trait, no heap trait objects);
//! the default provider is an Ollama-style `/api/generate` endpoint with a
//! per-call timeout baked into the HTTP client.
//!
//! Investigation stages never let an LLM failure escape: parse and
//! transport errors are caught at the stage boundary and answered with a
//! deterministic stub, so a missing or flaky model degrades the output
//! rather than the pipeline.

pub mod client;
pub mod config;
pub mod errors;

pub use client::{HttpLlmClient, LlmClient, strip_code_fences};
pub use config::LlmConfig;
pub use errors::{LlmServiceError, LlmServiceResult};
