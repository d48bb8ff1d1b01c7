use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{Completion, LlmProvider, estimate_tokens};
use crate::types::Turn;

/// Local model served by Ollama's `/api/chat`.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Whether the Ollama server answers at all.
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(url = %self.base_url, "ollama not reachable: {e}");
                false
            }
        }
    }
}

/// Request body: system prompt first, then history, then the new message.
pub fn build_request(
    model: &str,
    system_prompt: &str,
    history: &[Turn],
    message: &str,
) -> serde_json::Value {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(serde_json::json!({ "role": "system", "content": system_prompt }));
    messages.extend(history.iter().map(Turn::as_provider_message));
    messages.push(serde_json::json!({ "role": "user", "content": message }));

    serde_json::json!({
        "model": model,
        "messages": messages,
        "stream": false,
    })
}

pub fn parse_response(body: &serde_json::Value, message: &str) -> anyhow::Result<Completion> {
    let text = body
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("ollama response has no message content"))?
        .to_string();
    if text.trim().is_empty() {
        anyhow::bail!("ollama returned an empty reply");
    }

    let prompt_tokens = body.get("prompt_eval_count").and_then(|v| v.as_u64());
    let reply_tokens = body.get("eval_count").and_then(|v| v.as_u64());
    let tokens = match (prompt_tokens, reply_tokens) {
        (None, None) => estimate_tokens(message, &text),
        (p, r) => {
            let total = p.unwrap_or(0).saturating_add(r.unwrap_or(0));
            u32::try_from(total).unwrap_or(u32::MAX)
        }
    };

    Ok(Completion { text, tokens })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Turn],
        message: &str,
    ) -> anyhow::Result<Completion> {
        let body = build_request(&self.model, system_prompt, history, message);
        debug!(model = %self.model, turns = history.len(), "ollama request");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("ollama {status}: {text}");
        }

        let parsed: serde_json::Value = response.json().await?;
        parse_response(&parsed, message)
    }
}
