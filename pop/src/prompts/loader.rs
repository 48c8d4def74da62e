//! Prompt loader
//!
//! Loads prompt templates from the user override directory or falls back to
//! the embedded defaults, then renders them with Handlebars.

use std::path::PathBuf;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use crate::gateway::{MAX_DRAFTS, MIN_DRAFTS};

use super::embedded;

/// Template variables for the decomposition instruction
#[derive(Debug, Clone, Serialize)]
pub struct DecomposeContext {
    pub min_steps: usize,
    pub max_steps: usize,
}

impl Default for DecomposeContext {
    fn default() -> Self {
        Self {
            min_steps: MIN_DRAFTS,
            max_steps: MAX_DRAFTS,
        }
    }
}

/// Loads and renders prompt templates
///
/// Lookup order: `{user_dir}/{name}.pmt`, then the embedded fallback.
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Loader with a user override directory (kept only if it exists)
    pub fn new(user_dir: PathBuf) -> Self {
        let exists = user_dir.exists();
        debug!(user_dir = %user_dir.display(), exists, "PromptLoader::new");
        Self {
            hbs: Handlebars::new(),
            user_dir: exists.then_some(user_dir),
        }
    }

    /// Loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        Self {
            hbs: Handlebars::new(),
            user_dir: None,
        }
    }

    fn load_template(&self, name: &str) -> Result<String> {
        if let Some(user_dir) = &self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(path = %path.display(), "load_template: user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render the decomposition system instruction
    pub fn decompose_instruction(&self, context: &DecomposeContext) -> Result<String> {
        let template = self.load_template("decompose")?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render decompose template: {}", e))
    }
}
