//! Model gateway
//!
//! The external generative-model boundary, treated as an opaque remote
//! capability with exactly three operations: decompose an idea into task
//! drafts, execute a text task, execute an image task. Each call is a
//! one-shot suspend-until-response operation with no internal retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::TaskDraft;

mod error;
mod gemini;

pub use error::GatewayError;
pub use gemini::GeminiGateway;

/// Decomposition draft count bounds, enforced locally after parsing
pub const MIN_DRAFTS: usize = 5;
pub const MAX_DRAFTS: usize = 8;

/// Sentinel stored when a text execution returns an empty response
///
/// An empty completion is tolerated and degrades to this string; it is not
/// an error.
pub const NO_OUTPUT: &str = "No output generated.";

/// Aspect ratio for image generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    TwoThree,
    #[serde(rename = "3:2")]
    ThreeTwo,
    #[serde(rename = "3:4")]
    ThreeFour,
    #[serde(rename = "4:3")]
    FourThree,
    #[serde(rename = "9:16")]
    NineSixteen,
    #[serde(rename = "16:9")]
    SixteenNine,
    #[serde(rename = "21:9")]
    TwentyOneNine,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 8] = [
        Self::Square,
        Self::TwoThree,
        Self::ThreeTwo,
        Self::ThreeFour,
        Self::FourThree,
        Self::NineSixteen,
        Self::SixteenNine,
        Self::TwentyOneNine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::TwoThree => "2:3",
            Self::ThreeTwo => "3:2",
            Self::ThreeFour => "3:4",
            Self::FourThree => "4:3",
            Self::NineSixteen => "9:16",
            Self::SixteenNine => "16:9",
            Self::TwentyOneNine => "21:9",
        }
    }

    /// Next ratio in display order, wrapping
    pub fn cycled(&self) -> Self {
        let idx = Self::ALL.iter().position(|r| r == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output resolution tier for image generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [Self::OneK, Self::TwoK, Self::FourK];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }

    pub fn cycled(&self) -> Self {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-request image generation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: AspectRatio,
    #[serde(rename = "imageSize")]
    pub size: ImageSize,
}

/// A self-contained reference to a generated image
///
/// Holds the image as an embeddable data URI; nothing is written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// `data:{mime};base64,{payload}`
    pub uri: String,
    pub mime_type: String,
    /// Decoded payload size in bytes
    pub bytes: usize,
}

impl ImageReference {
    pub fn into_uri(self) -> String {
        self.uri
    }
}

/// Capability interface to the remote generative model
///
/// Constructed explicitly and injected wherever remote calls are made, so
/// tests can substitute [`MockPlanGateway`]. No conversation state is kept
/// between calls.
#[async_trait]
pub trait PlanGateway: Send + Sync {
    /// Decompose a free-text idea into 5-8 ordered task drafts
    ///
    /// The upstream model detects the idea's language and answers in it;
    /// draft count, field presence, and executor values are validated
    /// locally after any code-fence wrapper is stripped.
    async fn decompose(&self, idea: &str) -> Result<Vec<TaskDraft>, GatewayError>;

    /// Run a text prompt to completion and return the raw text
    ///
    /// An empty upstream response degrades to [`NO_OUTPUT`].
    async fn execute_text(&self, prompt: &str) -> Result<String, GatewayError>;

    /// Generate an image for a prompt
    ///
    /// Image bytes win over any accompanying text; refusal text without
    /// bytes fails with [`GatewayError::Refused`]; neither fails with
    /// [`GatewayError::NoImage`].
    async fn execute_image(&self, prompt: &str, config: &ImageConfig) -> Result<ImageReference, GatewayError>;
}

/// Scripted gateway for tests and offline demos
///
/// Responses are consumed front-to-back, one per call, mirroring the order
/// the code under test issues requests in.
#[derive(Default)]
pub struct MockPlanGateway {
    decompositions: std::sync::Mutex<std::collections::VecDeque<Result<Vec<TaskDraft>, GatewayError>>>,
    texts: std::sync::Mutex<std::collections::VecDeque<Result<String, GatewayError>>>,
    images: std::sync::Mutex<std::collections::VecDeque<Result<ImageReference, GatewayError>>>,
}

impl MockPlanGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_decomposition(&self, response: Result<Vec<TaskDraft>, GatewayError>) {
        self.decompositions.lock().unwrap().push_back(response);
    }

    pub fn push_text(&self, response: Result<String, GatewayError>) {
        self.texts.lock().unwrap().push_back(response);
    }

    pub fn push_image(&self, response: Result<ImageReference, GatewayError>) {
        self.images.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl PlanGateway for MockPlanGateway {
    async fn decompose(&self, _idea: &str) -> Result<Vec<TaskDraft>, GatewayError> {
        self.decompositions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Decomposition("no scripted response".to_string())))
    }

    async fn execute_text(&self, _prompt: &str) -> Result<String, GatewayError> {
        self.texts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Execution("no scripted response".to_string())))
    }

    async fn execute_image(&self, _prompt: &str, _config: &ImageConfig) -> Result<ImageReference, GatewayError> {
        self.images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::NoImage))
    }
}
