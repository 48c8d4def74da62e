//! Session workflow controller
//!
//! The single source of truth for the active plan. A [`Session`] is a pure
//! state machine: it validates transitions and folds in operation outcomes,
//! while the actual remote calls are driven by the caller (the TUI runner)
//! against the injected gateway. Every failure path lands back in a stable
//! phase; nothing here can wedge the session.

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{PlanError, ProjectPlan, ResultKind, Task, TaskDraft, TaskId, TaskUpdate};
use crate::gateway::{GatewayError, ImageConfig};

/// Result literal stored when the user marks a HUMAN/TOOL task done
pub const MANUAL_COMPLETION_RESULT: &str = "Marked as done by user.";

/// Output channel for an AI task execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Text,
    Image,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Workflow phase of the session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// No plan; the idea input screen
    #[default]
    Idle,
    /// Awaiting the decomposition call; holds the submitted idea
    Decomposing { idea: String },
    /// Plan exists; tasks may be selected, executed, or marked done
    Ready,
    /// One task's execution call is in flight
    Executing { task: TaskId },
}

impl Phase {
    /// Short name for error messages and the status line
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Decomposing { .. } => "decomposing",
            Self::Ready => "ready",
            Self::Executing { .. } => "executing",
        }
    }
}

/// Invalid transitions and propagated operation failures
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("No plan is active")]
    NoPlan,

    #[error("No task is selected")]
    NoSelection,

    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("Only AI tasks can be executed")]
    NotExecutable,

    #[error("AI tasks complete through execution, not manually")]
    ManualCompletionOnAi,

    #[error("An operation is already in flight")]
    Busy,

    #[error("{action} is not available while {phase}")]
    WrongPhase {
        action: &'static str,
        phase: &'static str,
    },
}

/// Everything the runner needs to issue one execution call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub task: TaskId,
    pub prompt: String,
    pub mode: ExecutionMode,
    pub image: ImageConfig,
}

/// Successful execution payload, folded into the plan on completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub result: String,
    pub kind: ResultKind,
}

/// One user's idea-to-plan workflow
///
/// Construction is the only way in and [`Session::restart`] the only way
/// back out; there is no ambient nullable plan state outside this type.
#[derive(Debug, Default)]
pub struct Session {
    phase: Phase,
    plan: Option<ProjectPlan>,
    selected: Option<TaskId>,
    mode: ExecutionMode,
    image_config: ImageConfig,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_executing(&self) -> bool {
        matches!(self.phase, Phase::Executing { .. })
    }

    pub fn plan(&self) -> Option<&ProjectPlan> {
        self.plan.as_ref()
    }

    pub fn selected_id(&self) -> Option<&TaskId> {
        self.selected.as_ref()
    }

    /// The currently selected task, if a plan exists and a task is selected
    pub fn selected_task(&self) -> Option<&Task> {
        let id = self.selected.as_ref()?;
        self.plan.as_ref()?.task(id)
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn image_config(&self) -> ImageConfig {
        self.image_config
    }

    /// (completed, total) task counts for the header
    pub fn progress(&self) -> (usize, usize) {
        match &self.plan {
            Some(plan) => (plan.completed_count(), plan.len()),
            None => (0, 0),
        }
    }

    /// Idle -> Decomposing
    ///
    /// Validates the idea locally before any remote call; a blank idea never
    /// leaves the input screen.
    pub fn submit_idea(&mut self, idea: &str) -> Result<(), SessionError> {
        match self.phase {
            Phase::Idle => {}
            Phase::Decomposing { .. } => return Err(SessionError::Busy),
            _ => {
                return Err(SessionError::WrongPhase {
                    action: "submit",
                    phase: self.phase.name(),
                });
            }
        }
        if idea.trim().is_empty() {
            return Err(PlanError::EmptyIdea.into());
        }

        info!(idea_len = idea.len(), "submit_idea: decomposition starting");
        self.phase = Phase::Decomposing { idea: idea.to_string() };
        Ok(())
    }

    /// Decomposing -> Ready (plan populated) or back to Idle on failure
    ///
    /// On failure no partial state is retained; the caller keeps the idea
    /// text in its input buffer so nothing the user typed is lost.
    pub fn complete_decompose(&mut self, outcome: Result<Vec<TaskDraft>, GatewayError>) -> Result<(), SessionError> {
        let idea = match &self.phase {
            Phase::Decomposing { idea } => idea.clone(),
            _ => {
                return Err(SessionError::WrongPhase {
                    action: "complete decomposition",
                    phase: self.phase.name(),
                });
            }
        };
        // Idle is the failure phase; only a fully built plan flips to Ready.
        self.phase = Phase::Idle;

        let drafts = outcome?;
        let plan = ProjectPlan::new(idea, drafts)?;
        info!(task_count = plan.len(), "complete_decompose: plan ready");

        self.plan = Some(plan);
        self.selected = None;
        self.mode = ExecutionMode::default();
        self.image_config = ImageConfig::default();
        self.phase = Phase::Ready;
        Ok(())
    }

    /// Change the selected task (view state; Ready only)
    ///
    /// Any task may be reselected any number of times, including after
    /// completion. When a different task becomes active the execution mode
    /// and image settings reset.
    pub fn select_task(&mut self, id: Option<TaskId>) -> Result<(), SessionError> {
        if self.phase != Phase::Ready {
            return Err(SessionError::WrongPhase {
                action: "select",
                phase: self.phase.name(),
            });
        }
        if let Some(id) = &id {
            let plan = self.plan.as_ref().ok_or(SessionError::NoPlan)?;
            if plan.task(id).is_none() {
                return Err(SessionError::UnknownTask(id.clone()));
            }
        }

        if self.selected != id {
            debug!(selected = ?id, "select_task: selection changed, mode reset");
            self.mode = ExecutionMode::default();
            self.image_config = ImageConfig::default();
        }
        self.selected = id;
        Ok(())
    }

    /// Set the execution mode for the selected AI task
    pub fn set_mode(&mut self, mode: ExecutionMode) -> Result<(), SessionError> {
        self.selected_ai_task()?;
        debug!(%mode, "set_mode");
        self.mode = mode;
        Ok(())
    }

    /// Adjust image settings for the selected AI task
    pub fn set_image_config(&mut self, config: ImageConfig) -> Result<(), SessionError> {
        self.selected_ai_task()?;
        self.image_config = config;
        Ok(())
    }

    /// Ready -> Executing for the selected AI task
    ///
    /// Returns the request the caller hands to the gateway. At most one
    /// execution is in flight: a second trigger fails with [`SessionError::Busy`].
    pub fn begin_execute(&mut self) -> Result<ExecutionRequest, SessionError> {
        if self.is_executing() {
            return Err(SessionError::Busy);
        }
        let task = self.selected_ai_task()?;

        let request = ExecutionRequest {
            task: task.id.clone(),
            prompt: task.actionable_content.clone(),
            mode: self.mode,
            image: self.image_config,
        };
        info!(task = %request.task, mode = %request.mode, "begin_execute");
        self.phase = Phase::Executing {
            task: request.task.clone(),
        };
        Ok(request)
    }

    /// Executing -> Ready, folding in the execution outcome
    ///
    /// On success the task completes with its result; on failure the task is
    /// untouched, stays pending, and may be retried. Either way the session
    /// is back in Ready.
    pub fn complete_execute(
        &mut self,
        task: &TaskId,
        outcome: Result<ExecutionOutcome, GatewayError>,
    ) -> Result<(), SessionError> {
        match &self.phase {
            Phase::Executing { task: in_flight } if in_flight == task => {}
            _ => {
                return Err(SessionError::WrongPhase {
                    action: "complete execution",
                    phase: self.phase.name(),
                });
            }
        }
        self.phase = Phase::Ready;

        let outcome = outcome.inspect_err(|e| info!(%task, error = %e, "complete_execute: failed, task stays pending"))?;

        let plan = self.plan.as_ref().ok_or(SessionError::NoPlan)?;
        self.plan = Some(plan.update_task(task, &TaskUpdate::completed(outcome.result, outcome.kind)));
        info!(%task, "complete_execute: task completed");
        Ok(())
    }

    /// Mark a HUMAN/TOOL task completed with the fixed result literal
    ///
    /// Idempotent: marking an already-completed task changes nothing.
    pub fn mark_completed(&mut self, task: &TaskId) -> Result<(), SessionError> {
        if self.phase != Phase::Ready {
            return Err(SessionError::WrongPhase {
                action: "mark completed",
                phase: self.phase.name(),
            });
        }
        let plan = self.plan.as_ref().ok_or(SessionError::NoPlan)?;
        let target = plan.task(task).ok_or_else(|| SessionError::UnknownTask(task.clone()))?;
        if target.executor.is_ai() {
            return Err(SessionError::ManualCompletionOnAi);
        }
        if target.is_completed() {
            debug!(%task, "mark_completed: already completed, no-op");
            return Ok(());
        }

        self.plan = Some(plan.update_task(task, &TaskUpdate::completed(MANUAL_COMPLETION_RESULT, ResultKind::Text)));
        info!(%task, "mark_completed: task completed manually");
        Ok(())
    }

    /// Discard the plan and return to Idle (irreversible)
    pub fn restart(&mut self) -> Result<(), SessionError> {
        if self.is_executing() {
            return Err(SessionError::Busy);
        }
        info!("restart: discarding plan");
        *self = Self::new();
        Ok(())
    }

    /// The selected task, required to be an executable AI task in Ready
    fn selected_ai_task(&self) -> Result<&Task, SessionError> {
        if self.phase != Phase::Ready {
            return Err(SessionError::WrongPhase {
                action: "execute",
                phase: self.phase.name(),
            });
        }
        if self.plan.is_none() {
            return Err(SessionError::NoPlan);
        }
        let task = self.selected_task().ok_or(SessionError::NoSelection)?;
        if !task.executor.is_ai() {
            return Err(SessionError::NotExecutable);
        }
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutorType, TaskStatus};
    use crate::gateway::{AspectRatio, ImageSize};

    fn bakery_drafts() -> Vec<TaskDraft> {
        let specs = [
            ("scout location", ExecutorType::Human),
            ("name the bakery", ExecutorType::Ai),
            ("write tagline", ExecutorType::Ai),
            ("design logo", ExecutorType::Ai),
            ("set up payments", ExecutorType::Tool),
            ("hire a baker", ExecutorType::Human),
        ];
        specs
            .into_iter()
            .map(|(name, executor)| TaskDraft {
                name: name.to_string(),
                executor,
                actionable_content: format!("content for {}", name),
            })
            .collect()
    }

    fn ready_session() -> Session {
        let mut session = Session::new();
        session.submit_idea("Launch a bakery").unwrap();
        session.complete_decompose(Ok(bakery_drafts())).unwrap();
        session
    }

    fn task_id(session: &Session, index: usize) -> TaskId {
        session.plan().unwrap().tasks[index].id.clone()
    }

    #[test]
    fn test_submit_blank_idea_stays_idle() {
        let mut session = Session::new();
        let err = session.submit_idea("   ").unwrap_err();
        assert!(matches!(err, SessionError::Plan(PlanError::EmptyIdea)));
        assert_eq!(session.phase(), &Phase::Idle);
    }

    #[test]
    fn test_submit_while_decomposing_is_busy() {
        let mut session = Session::new();
        session.submit_idea("an idea").unwrap();
        assert!(matches!(session.submit_idea("another"), Err(SessionError::Busy)));
    }

    #[test]
    fn test_decompose_success_populates_plan_without_selection() {
        let session = ready_session();
        assert_eq!(session.phase(), &Phase::Ready);
        let plan = session.plan().expect("plan should exist");
        assert_eq!(plan.original_idea, "Launch a bakery");
        assert_eq!(plan.len(), 6);
        // the full task list is shown first; nothing auto-selected
        assert!(session.selected_id().is_none());
    }

    #[test]
    fn test_decompose_failure_returns_to_idle_with_no_plan() {
        let mut session = Session::new();
        session.submit_idea("Launch a bakery").unwrap();
        let err = session
            .complete_decompose(Err(GatewayError::Decomposition("not valid JSON".to_string())))
            .unwrap_err();
        assert!(matches!(err, SessionError::Gateway(GatewayError::Decomposition(_))));
        assert_eq!(session.phase(), &Phase::Idle);
        assert!(session.plan().is_none());
    }

    #[test]
    fn test_select_unknown_task_is_rejected() {
        let mut session = ready_session();
        let ghost = TaskId::new();
        assert!(matches!(
            session.select_task(Some(ghost)),
            Err(SessionError::UnknownTask(_))
        ));
    }

    #[test]
    fn test_reselect_after_completion_is_allowed() {
        let mut session = ready_session();
        let human = task_id(&session, 0);
        session.select_task(Some(human.clone())).unwrap();
        session.mark_completed(&human).unwrap();
        session.select_task(None).unwrap();
        session.select_task(Some(human)).unwrap();
    }

    #[test]
    fn test_mode_resets_when_different_task_selected() {
        let mut session = ready_session();
        let tagline = task_id(&session, 2);
        let logo = task_id(&session, 3);

        session.select_task(Some(tagline)).unwrap();
        session.set_mode(ExecutionMode::Image).unwrap();
        session
            .set_image_config(ImageConfig {
                aspect_ratio: AspectRatio::SixteenNine,
                size: ImageSize::FourK,
            })
            .unwrap();

        session.select_task(Some(logo)).unwrap();
        assert_eq!(session.mode(), ExecutionMode::Text);
        assert_eq!(session.image_config(), ImageConfig::default());
    }

    #[test]
    fn test_mode_survives_reselecting_same_task() {
        let mut session = ready_session();
        let tagline = task_id(&session, 2);
        session.select_task(Some(tagline.clone())).unwrap();
        session.set_mode(ExecutionMode::Image).unwrap();
        session.select_task(Some(tagline)).unwrap();
        assert_eq!(session.mode(), ExecutionMode::Image);
    }

    #[test]
    fn test_set_mode_rejected_for_human_task() {
        let mut session = ready_session();
        let human = task_id(&session, 0);
        session.select_task(Some(human)).unwrap();
        assert!(matches!(
            session.set_mode(ExecutionMode::Image),
            Err(SessionError::NotExecutable)
        ));
    }

    #[test]
    fn test_execute_text_task_to_completion() {
        let mut session = ready_session();
        let tagline = task_id(&session, 2);
        session.select_task(Some(tagline.clone())).unwrap();

        let request = session.begin_execute().expect("AI task should execute");
        assert_eq!(request.task, tagline);
        assert_eq!(request.prompt, "content for write tagline");
        assert!(session.is_executing());

        session
            .complete_execute(
                &tagline,
                Ok(ExecutionOutcome {
                    result: "Fresh bread, daily.".to_string(),
                    kind: ResultKind::Text,
                }),
            )
            .unwrap();

        assert_eq!(session.phase(), &Phase::Ready);
        let task = session.plan().unwrap().task(&tagline).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result.as_deref(), Some("Fresh bread, daily."));
        assert_eq!(task.result_kind, Some(ResultKind::Text));
    }

    #[test]
    fn test_execute_human_task_is_rejected() {
        let mut session = ready_session();
        let human = task_id(&session, 0);
        session.select_task(Some(human)).unwrap();
        assert!(matches!(session.begin_execute(), Err(SessionError::NotExecutable)));
    }

    #[test]
    fn test_second_execute_while_in_flight_is_busy() {
        let mut session = ready_session();
        let tagline = task_id(&session, 2);
        session.select_task(Some(tagline)).unwrap();
        session.begin_execute().unwrap();
        assert!(matches!(session.begin_execute(), Err(SessionError::Busy)));
    }

    #[test]
    fn test_execution_failure_leaves_task_pending_and_retryable() {
        let mut session = ready_session();
        let logo = task_id(&session, 3);
        session.select_task(Some(logo.clone())).unwrap();
        session.set_mode(ExecutionMode::Image).unwrap();
        session.begin_execute().unwrap();

        let err = session
            .complete_execute(
                &logo,
                Err(GatewayError::Refused {
                    reason: "policy".to_string(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::Gateway(GatewayError::Refused { .. })));

        // task untouched, session stable, retry possible
        let task = session.plan().unwrap().task(&logo).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_none());
        assert_eq!(session.phase(), &Phase::Ready);
        assert!(session.begin_execute().is_ok());
    }

    #[test]
    fn test_failure_scoped_to_single_task() {
        let mut session = ready_session();
        let tagline = task_id(&session, 2);
        let logo = task_id(&session, 3);

        session.select_task(Some(tagline.clone())).unwrap();
        session.begin_execute().unwrap();
        session
            .complete_execute(
                &tagline,
                Ok(ExecutionOutcome {
                    result: "done".to_string(),
                    kind: ResultKind::Text,
                }),
            )
            .unwrap();

        session.select_task(Some(logo.clone())).unwrap();
        session.begin_execute().unwrap();
        let _ = session.complete_execute(&logo, Err(GatewayError::NoImage));

        // earlier completion unaffected
        assert!(session.plan().unwrap().task(&tagline).unwrap().is_completed());
        assert_eq!(session.progress(), (1, 6));
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let mut session = ready_session();
        let payments = task_id(&session, 4);
        session.mark_completed(&payments).unwrap();
        let after_first = session.plan().unwrap().clone();

        session.mark_completed(&payments).unwrap();
        assert_eq!(session.plan().unwrap(), &after_first);

        let task = session.plan().unwrap().task(&payments).unwrap();
        assert_eq!(task.result.as_deref(), Some(MANUAL_COMPLETION_RESULT));
        assert_eq!(task.result_kind, Some(ResultKind::Text));
    }

    #[test]
    fn test_mark_completed_rejected_for_ai_task() {
        let mut session = ready_session();
        let tagline = task_id(&session, 2);
        assert!(matches!(
            session.mark_completed(&tagline),
            Err(SessionError::ManualCompletionOnAi)
        ));
    }

    #[test]
    fn test_restart_discards_everything() {
        let mut session = ready_session();
        session.restart().unwrap();
        assert_eq!(session.phase(), &Phase::Idle);
        assert!(session.plan().is_none());
        assert!(session.selected_id().is_none());
    }

    #[test]
    fn test_restart_blocked_while_executing() {
        let mut session = ready_session();
        let tagline = task_id(&session, 2);
        session.select_task(Some(tagline)).unwrap();
        session.begin_execute().unwrap();
        assert!(matches!(session.restart(), Err(SessionError::Busy)));
    }
}
