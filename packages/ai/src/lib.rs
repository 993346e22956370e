#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Vision LLM provider abstraction and the land-use classifier adapter.
//!
//! Supports Anthropic Claude, `OpenAI`, and any `OpenAI`-compatible
//! local/self-hosted server (Ollama, vLLM, llama.cpp, LM Studio) via the
//! `AI_BASE_URL` environment variable. The classifier sends a captured map
//! screenshot plus its metadata to the provider and parses the free-form
//! answer into a land-use breakdown.

pub mod classifier;
pub mod image;
pub mod providers;
pub mod retry;

use site_profit_analysis::ParseError;
use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// No provider credentials or endpoint are set at all.
    #[error("AI provider not configured: {message}")]
    NotConfigured {
        /// Description.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },

    /// The screenshot could not be decoded or has an unsupported format.
    #[error("Invalid image: {message}")]
    InvalidImage {
        /// Description.
        message: String,
    },

    /// The provider answered, but no land-use breakdown could be parsed
    /// and the classifier is configured to abort in that case.
    #[error("Unusable classifier response: {0}")]
    Parse(#[from] ParseError),
}
