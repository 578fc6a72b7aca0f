#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Narrative generation with LLM provider abstraction.
//!
//! Supports Google Gemini and any `OpenAI`-compatible chat completion
//! endpoint via a common [`providers::TextGenerator`] trait. The
//! [`narrative`] module turns ward air-quality data into generation
//! prompts and extracts the structured analysis object back out of the
//! model's free-form response.

pub mod narrative;
pub mod providers;

use thiserror::Error;

/// Errors that can occur during narrative generation.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the LLM provider failed.
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

    /// The response contained no parseable analysis object.
    #[error("Unparsable generation response: {preview}")]
    Unparsable {
        /// Truncated preview of the offending response.
        preview: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
