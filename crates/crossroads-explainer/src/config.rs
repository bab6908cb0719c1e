//! Generator configuration loaded from the environment.
//!
//! The generator is optional. With `LLM_BACKEND` unset the engine runs
//! without one and every adaptive decision shows the fallback text.

use std::path::PathBuf;

use crate::error::ExplainerError;

/// Complete generator configuration.
#[derive(Debug, Clone)]
pub struct ExplainerConfig {
    /// The LLM backend to call.
    pub backend: LlmBackendConfig,
    /// Directory holding `system.j2` and `user.j2` that replace the
    /// built-in templates.
    pub templates_dir: Option<PathBuf>,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication. Empty for local servers.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl ExplainerConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when `LLM_BACKEND` is unset.
    ///
    /// Variables:
    /// - `LLM_BACKEND` -- `openai`, `deepseek`, `ollama`, or `anthropic`
    /// - `LLM_MODEL` -- model name (required once a backend is set)
    /// - `LLM_API_URL` -- API base URL (default depends on the backend)
    /// - `LLM_API_KEY` -- API key (default empty)
    /// - `EXPLAIN_TEMPLATES_DIR` -- template override directory
    pub fn from_env() -> Result<Option<Self>, ExplainerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ExplainerError> {
        let Some(backend_str) = lookup("LLM_BACKEND").filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };
        let name = backend_str.trim().to_lowercase();

        let (backend_type, default_url) = match name.as_str() {
            "openai" => (BackendType::OpenAi, "https://api.openai.com/v1"),
            "deepseek" => (BackendType::OpenAi, "https://api.deepseek.com/v1"),
            "ollama" => (BackendType::OpenAi, "http://localhost:11434/v1"),
            "anthropic" | "claude" => (BackendType::Anthropic, "https://api.anthropic.com/v1"),
            other => {
                return Err(ExplainerError::Config(format!(
                    "unknown backend type: {other}"
                )));
            }
        };

        let model = lookup("LLM_MODEL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ExplainerError::Config(format!("LLM_MODEL is required for backend {name}"))
            })?;

        let api_url = lookup("LLM_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default_url.to_owned());

        Ok(Some(Self {
            backend: LlmBackendConfig {
                backend_type,
                api_url: api_url.trim_end_matches('/').to_owned(),
                api_key: lookup("LLM_API_KEY").unwrap_or_default(),
                model,
            },
            templates_dir: lookup("EXPLAIN_TEMPLATES_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Option<ExplainerConfig>, ExplainerError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ExplainerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn unset_backend_means_no_generator() {
        let config = load(&[("LLM_MODEL", "ignored")]);
        assert!(matches!(config, Ok(None)));
    }

    #[test]
    fn ollama_uses_local_default_url() {
        let config = load(&[("LLM_BACKEND", "Ollama"), ("LLM_MODEL", "llama3")]);
        let config = config.unwrap().unwrap();
        assert_eq!(config.backend.backend_type, BackendType::OpenAi);
        assert_eq!(config.backend.api_url, "http://localhost:11434/v1");
        assert!(config.backend.api_key.is_empty());
        assert!(config.templates_dir.is_none());
    }

    #[test]
    fn anthropic_with_explicit_url_and_templates() {
        let config = load(&[
            ("LLM_BACKEND", "anthropic"),
            ("LLM_MODEL", "claude-haiku-4-5"),
            ("LLM_API_URL", "https://proxy.local/v1/"),
            ("LLM_API_KEY", "secret"),
            ("EXPLAIN_TEMPLATES_DIR", "/etc/crossroads/templates"),
        ]);
        let config = config.unwrap().unwrap();
        assert_eq!(config.backend.backend_type, BackendType::Anthropic);
        assert_eq!(config.backend.api_url, "https://proxy.local/v1");
        assert_eq!(config.backend.api_key, "secret");
        assert_eq!(
            config.templates_dir,
            Some(PathBuf::from("/etc/crossroads/templates"))
        );
    }

    #[test]
    fn missing_model_is_rejected() {
        let config = load(&[("LLM_BACKEND", "openai")]);
        assert!(matches!(config, Err(ExplainerError::Config(_))));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let config = load(&[("LLM_BACKEND", "carrier-pigeon"), ("LLM_MODEL", "x")]);
        assert!(matches!(config, Err(ExplainerError::Config(_))));
    }
}
