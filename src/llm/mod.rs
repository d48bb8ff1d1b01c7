pub mod gemini;
pub mod ollama;

use async_trait::async_trait;

use crate::config::AiConfig;
use crate::types::Turn;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;

/// A finished model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens: u32,
}

/// Trait for LLM provider implementations.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs and the stats endpoint.
    fn name(&self) -> &str;

    /// Generate a reply to `message` given the persona prompt and prior turns.
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Turn],
        message: &str,
    ) -> anyhow::Result<Completion>;
}

/// Rough token count when the provider does not report one (~4 chars/token).
pub fn estimate_tokens(prompt: &str, reply: &str) -> u32 {
    let chars = prompt.chars().count() + reply.chars().count();
    u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
}

/// Create a provider from config.
pub fn from_config(config: &AiConfig) -> anyhow::Result<Box<dyn LlmProvider>> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                anyhow::anyhow!("no API key for provider 'gemini'. Set GEMINI_API_KEY env var.")
            })?;
            Ok(Box::new(GeminiProvider::new(
                config.gemini_url.clone(),
                api_key,
                config.model.clone(),
            )))
        }
        "ollama" | "local" => Ok(Box::new(OllamaProvider::new(
            config.ollama_url.clone(),
            config.ollama_model.clone(),
        ))),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}
