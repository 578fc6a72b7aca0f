//! LLM provider abstraction and implementations.
//!
//! Supports Google Gemini and `OpenAI`-compatible endpoints via a common
//! trait.

pub mod gemini;
pub mod openai;

use crate::AiError;

/// Trait for text-generation providers.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends a single-prompt generation request and returns the raw
    /// response text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider returns
    /// an empty (e.g. safety-filtered) response.
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Creates a text generator based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `GEMINI_API_KEY` set -> Google Gemini
/// 2. `OPENAI_API_KEY` set -> `OpenAI`
///
/// `AI_MODEL` overrides the provider's default model.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn TextGenerator>, AiError> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| detect_provider());

    match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| AiError::Config {
                message: "GEMINI_API_KEY environment variable not set".to_string(),
            })?;
            let model =
                std::env::var("AI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());
            Ok(Box::new(gemini::GeminiProvider::new(api_key, model)))
        }
        "openai" | "gpt" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| AiError::Config {
                message: "OPENAI_API_KEY environment variable not set".to_string(),
            })?;
            let model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
            Ok(Box::new(openai::OpenAiProvider::new(api_key, model)))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'gemini' or 'openai'."),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name string that matches the arms in
/// [`create_provider_from_env`].
fn detect_provider() -> String {
    if std::env::var("GEMINI_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Gemini (GEMINI_API_KEY found)");
        return "gemini".to_string();
    }

    if std::env::var("OPENAI_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY found)");
        return "openai".to_string();
    }

    log::warn!(
        "No AI credentials detected. Set GEMINI_API_KEY or OPENAI_API_KEY. \
         You can also set AI_PROVIDER explicitly."
    );

    // Fall back to gemini; the missing-key error names the fix.
    "gemini".to_string()
}
