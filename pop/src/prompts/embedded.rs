//! Embedded prompts
//!
//! Compiled into the binary from `.pmt` files so the app works with no
//! files installed.

use tracing::debug;

/// Decomposition system instruction template
pub const DECOMPOSE: &str = include_str!("../../prompts/decompose.pmt");

/// Get an embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "decompose" => Some(DECOMPOSE),
        _ => None,
    }
}
