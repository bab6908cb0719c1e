//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup and the runs,
//! giving `main` a single error type to propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crossroads_core::config::ConfigError,
    },

    /// The explanation generator could not be set up.
    #[error("explainer error: {source}")]
    Explainer {
        /// The underlying explainer error.
        #[from]
        source: crossroads_explainer::error::ExplainerError,
    },

    /// A driver loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: crossroads_core::runner::RunnerError,
    },
}
