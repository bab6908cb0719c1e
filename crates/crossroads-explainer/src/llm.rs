//! LLM backend abstraction and implementations.
//!
//! Enum-based dispatch over the supported HTTP APIs, since async methods
//! are not dyn-compatible. Both backends send the rendered prompt and
//! return the reply as plain text.

use serde_json::Value;

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::ExplainerError;
use crate::prompt::RenderedPrompt;

/// Token budget for one reply. A single sentence fits comfortably.
const MAX_TOKENS: u32 = 128;

/// Sampling temperature. Low, for steady wording across cycles.
const TEMPERATURE: f64 = 0.3;

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// An LLM backend that can process a prompt and return a response.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Create a backend from configuration.
    pub fn new(config: &LlmBackendConfig) -> Self {
        match config.backend_type {
            BackendType::OpenAi => Self::OpenAi(OpenAiBackend::new(config)),
            BackendType::Anthropic => Self::Anthropic(AnthropicBackend::new(config)),
        }
    }

    /// Send a prompt to the LLM and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainerError::LlmBackend`] if the HTTP call fails or the
    /// response cannot be extracted.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, ExplainerError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt).await,
            Self::Anthropic(backend) => backend.complete(prompt).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    /// The model requests are sent to.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(backend) => &backend.model,
            Self::Anthropic(backend) => &backend.model,
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, and Ollama endpoints.
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn request_body(&self, prompt: &RenderedPrompt) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS
        })
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, ExplainerError> {
        let url = format!("{}/chat/completions", self.api_url);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt));
        // Local servers such as Ollama take no key.
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExplainerError::LlmBackend(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ExplainerError::LlmBackend(format!(
                "OpenAI returned {status}: {error_body}"
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            ExplainerError::LlmBackend(format!("OpenAI response parse failed: {e}"))
        })?;

        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &Value) -> Result<String, ExplainerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ExplainerError::LlmBackend(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Differs from `OpenAI` in three ways: an `x-api-key` header, the system
/// prompt as a top-level field, and replies under `content[0].text`.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn request_body(&self, prompt: &RenderedPrompt) -> Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        })
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, ExplainerError> {
        let url = format!("{}/messages", self.api_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| ExplainerError::LlmBackend(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ExplainerError::LlmBackend(format!(
                "Anthropic returned {status}: {error_body}"
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            ExplainerError::LlmBackend(format!("Anthropic response parse failed: {e}"))
        })?;

        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &Value) -> Result<String, ExplainerError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ExplainerError::LlmBackend("Anthropic response missing content[0].text".to_owned())
        })
}

/// Reduce a model reply to the bare sentence.
///
/// Models sometimes wrap the answer in quotes or a code fence, or prefix
/// it with a label. Returns an empty string when nothing is left.
pub fn clean_reply(raw: &str) -> String {
    let mut text = raw.trim();
    text = text.trim_start_matches("```").trim_end_matches("```").trim();
    if let Some(rest) = text.strip_prefix("Explanation:") {
        text = rest.trim();
    }
    text = text.trim_matches(|c| c == '"' || c == '\'' || c == '`').trim();
    text.lines().next().unwrap_or_default().trim().to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(backend_type: BackendType) -> LlmBackendConfig {
        LlmBackendConfig {
            backend_type,
            api_url: "http://localhost:11434/v1".to_owned(),
            api_key: String::new(),
            model: "test-model".to_owned(),
        }
    }

    fn prompt() -> RenderedPrompt {
        RenderedPrompt {
            system: "You are a traffic AI.".to_owned(),
            user: "Group: NS".to_owned(),
        }
    }

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": {"content": "NS received extra green for its longer queue."}
            }]
        });
        let result = extract_openai_content(&json).unwrap();
        assert!(result.contains("longer queue"));
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({
            "content": [{"type": "text", "text": "Siren detected on EW."}]
        });
        assert_eq!(
            extract_anthropic_content(&json).unwrap(),
            "Siren detected on EW."
        );
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn backend_dispatches_on_type() {
        let backend = LlmBackend::new(&config(BackendType::OpenAi));
        assert_eq!(backend.name(), "openai-compatible");
        assert_eq!(backend.model(), "test-model");

        let backend = LlmBackend::new(&config(BackendType::Anthropic));
        assert_eq!(backend.name(), "anthropic");
    }

    #[test]
    fn request_bodies_carry_prompt() {
        let openai = OpenAiBackend::new(&config(BackendType::OpenAi));
        let body = openai.request_body(&prompt());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Group: NS");
        assert_eq!(body["max_tokens"], MAX_TOKENS);

        let anthropic = AnthropicBackend::new(&config(BackendType::Anthropic));
        let body = anthropic.request_body(&prompt());
        assert_eq!(body["system"], "You are a traffic AI.");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn clean_reply_strips_wrapping() {
        assert_eq!(
            clean_reply("  \"Longer queue on NS.\"\n"),
            "Longer queue on NS."
        );
        assert_eq!(
            clean_reply("Explanation: Siren detected on EW.\nMore text."),
            "Siren detected on EW."
        );
        assert_eq!(clean_reply("```\nHeavy trucks on EW.\n```"), "Heavy trucks on EW.");
        assert!(clean_reply("  \"\" ").is_empty());
    }
}
