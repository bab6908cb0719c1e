//! Prompt template loading and rendering via `minijinja`.
//!
//! Two templates make up a prompt: `system.j2` sets the task and its
//! priorities, `user.j2` lays out the sensor data behind the decision. Both
//! are compiled into the binary and can be replaced from a directory so
//! operators can tune the wording without recompiling.

use std::path::Path;

use crossroads_core::explanation::ExplanationRequest;
use minijinja::Environment;
use serde::Serialize;

use crate::error::ExplainerError;

const BUILTIN_SYSTEM: &str = include_str!("../templates/system.j2");
const BUILTIN_USER: &str = include_str!("../templates/user.j2");

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message stating the task.
    pub system: String,
    /// User message carrying the decision data.
    pub user: String,
}

/// Template context: the request plus values derived from it.
#[derive(Serialize)]
struct PromptContext<'a> {
    #[serde(flatten)]
    request: &'a ExplanationRequest,
    group_green_s: f64,
}

impl PromptEngine {
    /// Create a prompt engine from the built-in templates.
    pub fn builtin() -> Result<Self, ExplainerError> {
        Self::from_sources(BUILTIN_SYSTEM.to_owned(), BUILTIN_USER.to_owned())
    }

    /// Create a prompt engine, loading templates from `templates_dir` when
    /// given. The directory must contain both `system.j2` and `user.j2`.
    pub fn new(templates_dir: Option<&Path>) -> Result<Self, ExplainerError> {
        match templates_dir {
            Some(dir) => Self::from_sources(
                load_template(dir, "system.j2")?,
                load_template(dir, "user.j2")?,
            ),
            None => Self::builtin(),
        }
    }

    fn from_sources(system: String, user: String) -> Result<Self, ExplainerError> {
        let mut env = Environment::new();
        env.add_template_owned("system", system)
            .map_err(|e| ExplainerError::Template(format!("failed to add system template: {e}")))?;
        env.add_template_owned("user", user)
            .map_err(|e| ExplainerError::Template(format!("failed to add user template: {e}")))?;
        Ok(Self { env })
    }

    /// Render the prompt explaining `request`.
    pub fn render(&self, request: &ExplanationRequest) -> Result<RenderedPrompt, ExplainerError> {
        let context = PromptContext {
            request,
            group_green_s: request.group_green_s(),
        };

        let system = self
            .env
            .get_template("system")
            .map_err(|e| ExplainerError::Template(format!("missing system template: {e}")))?
            .render(&context)
            .map_err(|e| ExplainerError::Template(format!("system render failed: {e}")))?;

        let user = self
            .env
            .get_template("user")
            .map_err(|e| ExplainerError::Template(format!("missing user template: {e}")))?
            .render(&context)
            .map_err(|e| ExplainerError::Template(format!("user render failed: {e}")))?;

        Ok(RenderedPrompt {
            system: system.trim().to_owned(),
            user: user.trim().to_owned(),
        })
    }
}

/// Read a template file from disk.
fn load_template(dir: &Path, filename: &str) -> Result<String, ExplainerError> {
    let path = dir.join(filename);
    std::fs::read_to_string(&path)
        .map_err(|e| ExplainerError::Template(format!("failed to read {}: {e}", path.display())))
}
