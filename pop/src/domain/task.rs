//! Task domain types
//!
//! A task is one step of a decomposed plan. Tasks are created in a single
//! batch when decomposition succeeds and are never added or removed
//! afterwards; only completion state mutates, via [`TaskUpdate`].

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Who (or what) carries out a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutorType {
    /// Content generation, analysis, coding, design, image work
    Ai,
    /// Physical presence or high-judgment work
    Human,
    /// Automatable SaaS-category work
    Tool,
}

impl ExecutorType {
    /// Short badge text for list views
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Ai => "AI",
            Self::Human => "HUM",
            Self::Tool => "TOOL",
        }
    }

    /// Heading shown above the actionable content
    pub fn content_label(&self) -> &'static str {
        match self {
            Self::Ai => "Prompt strategy",
            Self::Human => "Your action list",
            Self::Tool => "Tool recommendation",
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Self::Ai)
    }
}

impl std::fmt::Display for ExecutorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ai => write!(f, "AI"),
            Self::Human => write!(f, "HUMAN"),
            Self::Tool => write!(f, "TOOL"),
        }
    }
}

/// Completion state of a task
///
/// Transitions once, Pending -> Completed, and never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// What kind of payload a completed task carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Text,
    Image,
}

/// Opaque task identifier, unique within a plan
///
/// UUID v7 based, so ids stay unique even for tasks created in the same
/// decomposition batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl serde::Serialize for TaskId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/// A task as drafted by decomposition - no id or status yet
///
/// Field names match the decomposition wire schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(rename = "task_name")]
    pub name: String,
    #[serde(rename = "executor_type")]
    pub executor: ExecutorType,
    pub actionable_content: String,
}

/// One step of an active plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier, assigned at plan creation
    pub id: TaskId,
    /// Human-readable short label
    pub name: String,
    /// Fixed at creation, never changes
    pub executor: ExecutorType,
    /// Prompt for AI, job description for HUMAN, tool recommendation for TOOL
    pub actionable_content: String,
    pub status: TaskStatus,
    /// Text or image data URI; present iff status is Completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Set together with `result`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_kind: Option<ResultKind>,
}

impl Task {
    /// Materialize a draft into a pending task with a fresh id
    pub fn from_draft(draft: TaskDraft) -> Self {
        let id = TaskId::new();
        debug!(%id, name = %draft.name, executor = %draft.executor, "Task::from_draft");
        Self {
            id,
            name: draft.name,
            executor: draft.executor,
            actionable_content: draft.actionable_content,
            status: TaskStatus::Pending,
            result: None,
            result_kind: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Apply an update, producing a new task value
    ///
    /// Fields absent from the update are left untouched.
    pub fn apply(&self, update: &TaskUpdate) -> Self {
        let mut next = self.clone();
        if let Some(status) = update.status {
            next.status = status;
        }
        if let Some(result) = &update.result {
            next.result = Some(result.clone());
        }
        if let Some(kind) = update.result_kind {
            next.result_kind = Some(kind);
        }
        next
    }
}

/// Partial update merged into a task by [`ProjectPlan::update_task`]
///
/// [`ProjectPlan::update_task`]: super::ProjectPlan::update_task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub result: Option<String>,
    pub result_kind: Option<ResultKind>,
}

impl TaskUpdate {
    /// A consistent completion update: status, result, and result kind
    /// always set together, so the result/result_kind invariant holds by
    /// construction.
    pub fn completed(result: impl Into<String>, kind: ResultKind) -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            result: Some(result.into()),
            result_kind: Some(kind),
        }
    }
}
