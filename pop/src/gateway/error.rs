//! Gateway error types

use thiserror::Error;

/// Errors from the three remote gateway operations
///
/// Every variant surfaces to the user as a notification naming the failed
/// action; none are retried automatically.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Upstream returned unusable plan data (bad JSON, schema violation,
    /// draft count out of range)
    #[error("Decomposition failed: {0}")]
    Decomposition(String),

    /// Text execution call failed
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Upstream declined to generate the image, with its stated reason
    #[error("Image generation refused: {reason}")]
    Refused { reason: String },

    /// Upstream returned neither image bytes nor refusal text
    #[error("No image data found in response")]
    NoImage,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl GatewayError {
    /// Whether the failed call may be re-triggered by the user
    ///
    /// Everything is retryable from the UI's point of view except a refusal,
    /// which repeats deterministically for the same prompt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GatewayError::Refused { .. })
    }
}
