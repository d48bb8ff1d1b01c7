use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{Completion, LlmProvider, estimate_tokens};
use crate::types::{Speaker, Turn};

/// Google Gemini `generateContent` client.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

/// Request body. Gemini calls the assistant role `model`.
pub fn build_request(system_prompt: &str, history: &[Turn], message: &str) -> serde_json::Value {
    let mut contents: Vec<serde_json::Value> = history
        .iter()
        .map(|turn| {
            let role = match turn.speaker() {
                Speaker::User => "user",
                Speaker::Assistant => "model",
            };
            serde_json::json!({ "role": role, "parts": [{ "text": turn.text() }] })
        })
        .collect();
    contents.push(serde_json::json!({ "role": "user", "parts": [{ "text": message }] }));

    serde_json::json!({
        "systemInstruction": { "parts": [{ "text": system_prompt }] },
        "contents": contents,
    })
}

/// Pull the reply text and token usage out of a `generateContent` response.
pub fn parse_response(body: &serde_json::Value, message: &str) -> anyhow::Result<Completion> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("gemini response has no candidates"))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() {
        anyhow::bail!("gemini returned an empty reply");
    }

    let tokens = body
        .get("usageMetadata")
        .and_then(|u| u.get("totalTokenCount"))
        .and_then(|t| t.as_u64())
        .map(|t| u32::try_from(t).unwrap_or(u32::MAX))
        .unwrap_or_else(|| estimate_tokens(message, &text));

    Ok(Completion { text, tokens })
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Turn],
        message: &str,
    ) -> anyhow::Result<Completion> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = build_request(system_prompt, history, message);
        debug!(model = %self.model, turns = history.len(), "gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("gemini {status}: {text}");
        }

        let parsed: serde_json::Value = response.json().await?;
        parse_response(&parsed, message)
    }
}
