//! ProjectPlan domain type
//!
//! The plan is the ordered collection of tasks derived from one submitted
//! idea. It is created atomically when decomposition succeeds and replaced
//! wholesale on every mutation, so readers never observe a half-updated task
//! list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::task::{Task, TaskDraft, TaskId, TaskUpdate};

/// Validation failures when building a plan from local input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Idea is empty - describe what you want to build")]
    EmptyIdea,

    #[error("Decomposition produced no tasks")]
    NoTasks,
}

/// An ordered plan seeded from one user idea
///
/// Task order is the decomposition order and represents the workflow
/// sequence; it is never changed after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPlan {
    /// The immutable user-submitted text that seeded the plan
    pub original_idea: String,
    /// Insertion order = decomposition order
    pub tasks: Vec<Task>,
    /// When decomposition succeeded
    pub created_at: DateTime<Utc>,
}

impl ProjectPlan {
    /// Build a plan from an idea and the drafts decomposition returned
    ///
    /// Fails on a blank idea or an empty draft list. Each draft gets a fresh
    /// unique id and starts pending.
    pub fn new(idea: impl Into<String>, drafts: Vec<TaskDraft>) -> Result<Self, PlanError> {
        let idea = idea.into();
        if idea.trim().is_empty() {
            return Err(PlanError::EmptyIdea);
        }
        if drafts.is_empty() {
            return Err(PlanError::NoTasks);
        }

        let tasks: Vec<Task> = drafts.into_iter().map(Task::from_draft).collect();
        debug!(task_count = tasks.len(), "ProjectPlan::new: plan created");

        Ok(Self {
            original_idea: idea,
            tasks,
            created_at: Utc::now(),
        })
    }

    /// Merge an update into the task with the given id, returning a new plan
    ///
    /// An unknown id is an explicit no-op: the plan comes back unchanged
    /// rather than silently corrupting the task list.
    pub fn update_task(&self, id: &TaskId, update: &TaskUpdate) -> ProjectPlan {
        let mut next = self.clone();
        match next.tasks.iter_mut().find(|t| &t.id == id) {
            Some(task) => {
                *task = task.apply(update);
                debug!(%id, "ProjectPlan::update_task: task updated");
            }
            None => {
                debug!(%id, "ProjectPlan::update_task: unknown id, no-op");
            }
        }
        next
    }

    /// Look up a task by id
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// How many tasks are completed
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{ExecutorType, ResultKind, TaskStatus};
    use proptest::prelude::*;

    fn drafts(names: &[&str]) -> Vec<TaskDraft> {
        names
            .iter()
            .map(|n| TaskDraft {
                name: n.to_string(),
                executor: ExecutorType::Ai,
                actionable_content: format!("prompt for {}", n),
            })
            .collect()
    }

    fn sample_plan() -> ProjectPlan {
        ProjectPlan::new("Launch a bakery", drafts(&["scout", "brand", "menu", "site", "open"]))
            .expect("sample plan should build")
    }

    #[test]
    fn test_new_rejects_blank_idea() {
        assert_eq!(
            ProjectPlan::new("   \t", drafts(&["a"])).unwrap_err(),
            PlanError::EmptyIdea
        );
    }

    #[test]
    fn test_new_rejects_empty_drafts() {
        assert_eq!(ProjectPlan::new("an idea", vec![]).unwrap_err(), PlanError::NoTasks);
    }

    #[test]
    fn test_update_unknown_id_returns_equal_plan() {
        let plan = sample_plan();
        let ghost = TaskId::new();
        let next = plan.update_task(&ghost, &TaskUpdate::completed("x", ResultKind::Text));
        assert_eq!(next, plan);
    }

    #[test]
    fn test_update_known_id_changes_only_that_task() {
        let plan = sample_plan();
        let target = plan.tasks[2].id.clone();
        let next = plan.update_task(&target, &TaskUpdate::completed("done", ResultKind::Text));

        for (before, after) in plan.tasks.iter().zip(next.tasks.iter()) {
            if before.id == target {
                assert_eq!(after.status, TaskStatus::Completed);
                assert_eq!(after.result.as_deref(), Some("done"));
            } else {
                assert_eq!(before, after, "untouched tasks must compare equal");
            }
        }
        // the original plan value is untouched (copy-on-write)
        assert_eq!(plan.tasks[2].status, TaskStatus::Pending);
    }

    #[test]
    fn test_update_preserves_order() {
        let plan = sample_plan();
        let target = plan.tasks[0].id.clone();
        let next = plan.update_task(&target, &TaskUpdate::completed("ok", ResultKind::Text));
        let names: Vec<&str> = next.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["scout", "brand", "menu", "site", "open"]);
    }

    #[test]
    fn test_completed_count() {
        let plan = sample_plan();
        assert_eq!(plan.completed_count(), 0);
        let id = plan.tasks[1].id.clone();
        let next = plan.update_task(&id, &TaskUpdate::completed("ok", ResultKind::Text));
        assert_eq!(next.completed_count(), 1);
    }

    // Round-trip property: guards task order and all fields if persistence
    // is ever added.
    #[test]
    fn test_serde_round_trip_preserves_plan() {
        let plan = sample_plan();
        let id = plan.tasks[3].id.clone();
        let plan = plan.update_task(&id, &TaskUpdate::completed("a result", ResultKind::Image));

        let json = serde_json::to_string(&plan).expect("plan should serialize");
        let reloaded: ProjectPlan = serde_json::from_str(&json).expect("plan should deserialize");
        assert_eq!(reloaded, plan);
    }

    proptest! {
        #[test]
        fn prop_unknown_id_update_is_identity(
            names in proptest::collection::vec("[a-z]{1,12}", 5..=8),
            result in "[a-zA-Z0-9 ]{0,40}",
        ) {
            let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let plan = ProjectPlan::new("prop idea", drafts(&name_refs)).unwrap();
            let next = plan.update_task(&TaskId::new(), &TaskUpdate::completed(result, ResultKind::Text));
            prop_assert_eq!(next, plan);
        }

        #[test]
        fn prop_known_id_update_touches_one_task(
            names in proptest::collection::vec("[a-z]{1,12}", 5..=8),
            pick in 0usize..5,
        ) {
            let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let plan = ProjectPlan::new("prop idea", drafts(&name_refs)).unwrap();
            let target = plan.tasks[pick].id.clone();
            let next = plan.update_task(&target, &TaskUpdate::completed("r", ResultKind::Text));

            let changed = plan
                .tasks
                .iter()
                .zip(next.tasks.iter())
                .filter(|(b, a)| b != a)
                .count();
            prop_assert_eq!(changed, 1);
        }
    }
}
