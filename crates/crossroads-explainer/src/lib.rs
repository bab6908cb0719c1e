//! LLM-backed decision explanations for the Crossroads simulation.
//!
//! [`LlmExplainer`] implements [`ExplanationSource`]: it renders the
//! decision data into a prompt, sends it to the configured backend, and
//! returns the one-sentence reply. The driver bounds every call with a
//! timeout and falls back to fixed text on any error, so nothing here is
//! on the critical path of the signal cycle.
//!
//! # Modules
//!
//! - [`config`] -- [`ExplainerConfig`] loaded from `LLM_*` environment
//!   variables.
//! - [`error`] -- [`ExplainerError`].
//! - [`llm`] -- OpenAI-compatible and Anthropic HTTP backends.
//! - [`prompt`] -- `minijinja` templates for the system and user messages.
//!
//! [`ExplanationSource`]: crossroads_core::explanation::ExplanationSource
//! [`ExplainerConfig`]: config::ExplainerConfig
//! [`ExplainerError`]: error::ExplainerError

pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;

use crossroads_core::explanation::{ExplanationError, ExplanationRequest, ExplanationSource};
use tracing::debug;

use crate::config::ExplainerConfig;
use crate::error::ExplainerError;
use crate::llm::{LlmBackend, clean_reply};
use crate::prompt::PromptEngine;

/// Explanation source that asks an LLM.
pub struct LlmExplainer {
    backend: LlmBackend,
    prompts: PromptEngine,
}

impl LlmExplainer {
    /// Build the backend and load the prompt templates.
    pub fn new(config: &ExplainerConfig) -> Result<Self, ExplainerError> {
        Ok(Self {
            backend: LlmBackend::new(&config.backend),
            prompts: PromptEngine::new(config.templates_dir.as_deref())?,
        })
    }

    /// Backend name for logging.
    pub const fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Model name for logging.
    pub fn model(&self) -> &str {
        self.backend.model()
    }
}

impl ExplanationSource for LlmExplainer {
    async fn explain(&self, request: &ExplanationRequest) -> Result<String, ExplanationError> {
        let prompt = self
            .prompts
            .render(request)
            .map_err(|e| ExplanationError::Unavailable {
                message: e.to_string(),
            })?;

        let raw = self
            .backend
            .complete(&prompt)
            .await
            .map_err(|e| ExplanationError::Unavailable {
                message: e.to_string(),
            })?;

        let text = clean_reply(&raw);
        if text.is_empty() {
            return Err(ExplanationError::Unavailable {
                message: format!("{} returned an empty reply", self.backend.name()),
            });
        }

        debug!(
            backend = self.backend.name(),
            group = %request.group,
            chars = text.len(),
            "LLM explanation received"
        );
        Ok(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use crossroads_core::explanation::{FALLBACK_EXPLANATION, resolve_explanation};
    use crossroads_types::Approach;

    use super::*;
    use crate::config::{BackendType, LlmBackendConfig};

    fn request() -> ExplanationRequest {
        ExplanationRequest {
            group: Approach::EastWest,
            ns_green_s: 22.0,
            ew_green_s: 38.0,
            delta_used_s: 8.0,
            ns_queue: 4.0,
            ew_queue: 31.0,
            ns_count: 30.0,
            ew_count: 50.0,
            ns_mean: 10.0,
            ew_mean: 24.0,
            ns_weight: 3.0,
            ew_weight: 3.5,
            ns_emergency: false,
            ew_emergency: true,
        }
    }

    fn unreachable_config() -> ExplainerConfig {
        ExplainerConfig {
            backend: LlmBackendConfig {
                backend_type: BackendType::OpenAi,
                // Reserved port on loopback: the connection is refused at once.
                api_url: "http://127.0.0.1:9/v1".to_owned(),
                api_key: String::new(),
                model: "test-model".to_owned(),
            },
            templates_dir: None,
        }
    }

    #[test]
    fn builds_with_builtin_templates() {
        let explainer = LlmExplainer::new(&unreachable_config()).unwrap();
        assert_eq!(explainer.backend_name(), "openai-compatible");
        assert_eq!(explainer.model(), "test-model");
    }

    #[test]
    fn bad_template_dir_is_a_setup_error() {
        let mut config = unreachable_config();
        config.templates_dir = Some(std::env::temp_dir().join("crossroads_no_such_templates"));
        assert!(matches!(
            LlmExplainer::new(&config),
            Err(ExplainerError::Template(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        let explainer = LlmExplainer::new(&unreachable_config()).unwrap();
        let result = explainer.explain(&request()).await;
        assert!(matches!(result, Err(ExplanationError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn unreachable_backend_resolves_to_fallback() {
        let explainer = LlmExplainer::new(&unreachable_config()).unwrap();
        let text = resolve_explanation(&explainer, &request(), Duration::from_secs(5)).await;
        assert_eq!(text, FALLBACK_EXPLANATION);
    }
}
