//! Prompt template system
//!
//! The decomposition system instruction ships embedded in the binary and can
//! be overridden per user from `~/.config/popcorn/prompts/decompose.pmt`.
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{DecomposeContext, PromptLoader};
