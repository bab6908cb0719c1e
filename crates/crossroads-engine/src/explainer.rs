//! Explanation source selection.

use crossroads_core::config::ExplanationConfig;
use crossroads_core::explanation::{
    DisabledExplanationSource, ExplanationError, ExplanationRequest, ExplanationSource,
};
use crossroads_explainer::LlmExplainer;
use crossroads_explainer::config::ExplainerConfig;
use tracing::info;

use crate::error::EngineError;

/// The explanation source both runs share.
pub enum Explainer {
    /// An LLM behind an HTTP API.
    Llm(Box<LlmExplainer>),
    /// No generator; adaptive decisions show fallback text.
    Disabled(DisabledExplanationSource),
}

impl Explainer {
    /// Pick the source: the LLM when explanations are enabled and the
    /// environment names a backend, otherwise the disabled source.
    pub fn select(
        explanation: &ExplanationConfig,
        llm: Option<&ExplainerConfig>,
    ) -> Result<Self, EngineError> {
        if !explanation.enabled {
            info!("Explanations disabled by configuration");
            return Ok(Self::Disabled(DisabledExplanationSource::new()));
        }
        match llm {
            Some(config) => {
                let explainer = LlmExplainer::new(config)?;
                info!(
                    backend = explainer.backend_name(),
                    model = explainer.model(),
                    api_url = %config.backend.api_url,
                    timeout_ms = explanation.timeout_ms,
                    "LLM explanations enabled"
                );
                Ok(Self::Llm(Box::new(explainer)))
            }
            None => {
                info!("LLM_BACKEND not set, explanations disabled");
                Ok(Self::Disabled(DisabledExplanationSource::new()))
            }
        }
    }

    /// Human-readable name for logging.
    pub fn name(&self) -> &str {
        match self {
            Self::Llm(explainer) => explainer.backend_name(),
            Self::Disabled(_) => "disabled",
        }
    }
}

impl ExplanationSource for Explainer {
    async fn explain(&self, request: &ExplanationRequest) -> Result<String, ExplanationError> {
        match self {
            Self::Llm(explainer) => explainer.explain(request).await,
            Self::Disabled(source) => source.explain(request).await,
        }
    }
}
