//! Plan data model
//!
//! Pure data plus validation; no behavior beyond construction and field
//! update. Everything else (remote calls, workflow phases) lives in
//! [`crate::gateway`] and [`crate::session`].

mod plan;
mod task;

pub use plan::{PlanError, ProjectPlan};
pub use task::{ExecutorType, ResultKind, Task, TaskDraft, TaskId, TaskStatus, TaskUpdate};
