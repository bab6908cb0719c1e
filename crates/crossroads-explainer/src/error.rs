//! Error types for the explanation generator.

/// Errors that can occur while building or calling the generator.
#[derive(Debug, thiserror::Error)]
pub enum ExplainerError {
    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// Configuration is invalid or incomplete.
    #[error("config error: {0}")]
    Config(String),
}
