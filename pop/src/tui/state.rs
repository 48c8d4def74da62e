//! TUI application state
//!
//! Pure data for the TUI: the workflow session plus view-only concerns
//! (input buffer, cursor, dialogs, spinner). No rendering logic here.

use std::time::Instant;

use rand::seq::IndexedRandom;
use tracing::debug;

use crate::domain::{Task, TaskId};
use crate::session::Session;

/// Rotating words for the in-flight status indicator
pub const WORKING_WORDS: &[&str] = &[
    "Unbundling",
    "Rebundling",
    "Popping",
    "Sifting",
    "Kneading",
    "Sketching",
    "Weighing",
    "Sorting",
];

/// Interaction mode (modal)
#[derive(Debug, Clone, Default)]
pub enum InteractionMode {
    /// Normal navigation / typing
    #[default]
    Normal,
    /// Confirmation dialog for irreversible actions
    Confirm(ConfirmDialog),
    /// Help overlay
    Help,
}

/// Confirmation dialog for irreversible actions
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    pub message: String,
    pub action: ConfirmAction,
    pub selected_button: bool, // false = No, true = Yes
}

impl ConfirmDialog {
    pub fn new(action: ConfirmAction, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            action,
            selected_button: false,
        }
    }

    pub fn quit() -> Self {
        Self::new(ConfirmAction::Quit, "Quit and discard the current plan?")
    }

    pub fn restart() -> Self {
        Self::new(
            ConfirmAction::Restart,
            "Restart discards the plan and all results. Continue?",
        )
    }
}

/// Action to perform on confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    Quit,
    Restart,
}

/// Main TUI application state
#[derive(Debug, Default)]
pub struct AppState {
    /// The workflow session (single source of truth for the plan)
    pub session: Session,
    /// Idea input buffer; survives decomposition failure so nothing typed
    /// is lost
    pub idea_input: String,
    /// Highlighted row in the task list
    pub cursor: usize,
    pub interaction_mode: InteractionMode,
    /// Last error, shown until the next key press
    pub error_message: Option<String>,
    pub should_quit: bool,

    /// Idea queued for the runner to decompose
    pub pending_submit: Option<String>,
    /// Execution trigger queued for the runner
    pub pending_execute: bool,

    /// Scroll offset for the task detail pane
    pub detail_scroll: u16,

    /// Spinner word while a remote call is in flight
    pub working_word: String,
    /// When the in-flight call started (for elapsed display)
    pub working_since: Option<Instant>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!(%msg, "AppState::set_error");
        self.error_message = Some(msg);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Pick a spinner word and start the elapsed clock
    pub fn start_working(&mut self) {
        let mut rng = rand::rng();
        self.working_word = WORKING_WORDS.choose(&mut rng).unwrap_or(&"Working").to_string();
        self.working_since = Some(Instant::now());
    }

    pub fn stop_working(&mut self) {
        self.working_since = None;
    }

    /// Seconds since the in-flight call started
    pub fn working_elapsed_secs(&self) -> u64 {
        self.working_since.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    /// Task under the cursor, if any
    pub fn task_at_cursor(&self) -> Option<&Task> {
        self.session.plan()?.tasks.get(self.cursor)
    }

    /// Id of the task under the cursor
    pub fn id_at_cursor(&self) -> Option<TaskId> {
        self.task_at_cursor().map(|t| t.id.clone())
    }

    /// Move the cursor within the task list, clamped
    pub fn move_cursor(&mut self, delta: isize) {
        let count = self.session.plan().map(|p| p.len()).unwrap_or(0);
        if count == 0 {
            self.cursor = 0;
            return;
        }
        let max = count - 1;
        let next = self.cursor.saturating_add_signed(delta).min(max);
        if next != self.cursor {
            self.cursor = next;
            self.detail_scroll = 0;
        }
    }

    pub fn cursor_to_first(&mut self) {
        self.cursor = 0;
        self.detail_scroll = 0;
    }

    pub fn cursor_to_last(&mut self) {
        let count = self.session.plan().map(|p| p.len()).unwrap_or(0);
        self.cursor = count.saturating_sub(1);
        self.detail_scroll = 0;
    }
}
