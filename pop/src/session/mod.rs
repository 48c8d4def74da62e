//! Task workflow controller
//!
//! Orchestrates task selection, execution invocation, and state updates for
//! the one active plan.

mod controller;

pub use controller::{
    ExecutionMode, ExecutionOutcome, ExecutionRequest, MANUAL_COMPLETION_RESULT, Phase, Session, SessionError,
};
