//! popcorn - idea-to-plan decomposition studio
//!
//! popcorn turns a free-text idea into a structured project plan, then lets
//! the user drive execution of each plan item through a generative model.
//! Decomposition, language detection, and text/image generation are all
//! delegated to the remote model; the core of the crate is the plan data
//! model and the task-execution workflow around it.
//!
//! # Modules
//!
//! - [`domain`] - Task and ProjectPlan entities and their valid states
//! - [`gateway`] - the remote model boundary: decompose, text, image
//! - [`session`] - the workflow state machine driving the active plan
//! - [`prompts`] - embedded/overridable prompt templates
//! - [`tui`] - terminal presentation layer
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod prompts;
pub mod session;
pub mod tui;

// Re-export commonly used types
pub use config::{Config, GatewayConfig, ResolvedGatewayConfig};
pub use domain::{ExecutorType, PlanError, ProjectPlan, ResultKind, Task, TaskDraft, TaskId, TaskStatus, TaskUpdate};
pub use gateway::{
    AspectRatio, GatewayError, GeminiGateway, ImageConfig, ImageReference, ImageSize, MockPlanGateway, NO_OUTPUT,
    PlanGateway,
};
pub use prompts::{DecomposeContext, PromptLoader};
pub use session::{ExecutionMode, ExecutionOutcome, ExecutionRequest, Phase, Session, SessionError};
