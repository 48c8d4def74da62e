//! TUI application - event handling
//!
//! The App owns the AppState and translates keyboard events into session
//! transitions and queued work for the runner. No rendering here; that is
//! the views module.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::session::{ExecutionMode, Phase};

use super::state::{AppState, ConfirmAction, ConfirmDialog, InteractionMode};

/// TUI application
#[derive(Debug, Default)]
pub struct App {
    state: AppState,
}

impl App {
    pub fn new() -> Self {
        Self { state: AppState::new() }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    /// Handle a key event; returns true when the application should exit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Transient errors clear on the next key press
        self.state.clear_error();

        match &self.state.interaction_mode {
            InteractionMode::Normal => self.handle_normal_key(key),
            InteractionMode::Confirm(_) => self.handle_confirm_key(key),
            InteractionMode::Help => self.handle_help_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true; // force quit
        }
        if key.code == KeyCode::F(1) {
            self.state.interaction_mode = InteractionMode::Help;
            return false;
        }

        match self.state.session.phase() {
            Phase::Idle => self.handle_hero_key(key),
            // One operation in flight: ignore everything but quit/help
            Phase::Decomposing { .. } | Phase::Executing { .. } => {}
            Phase::Ready => self.handle_board_key(key),
        }

        false
    }

    /// Keys on the idea input screen
    fn handle_hero_key(&mut self, key: KeyEvent) {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => {
                let idea = self.state.idea_input.clone();
                if idea.trim().is_empty() {
                    self.state.set_error("Describe your idea first");
                } else {
                    debug!(idea_len = idea.len(), "hero: submitting idea");
                    self.state.pending_submit = Some(idea);
                }
            }
            (KeyCode::Backspace, _) => {
                self.state.idea_input.pop();
            }
            (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                self.state.idea_input.push(c);
            }
            _ => {}
        }
    }

    /// Keys on the plan board
    fn handle_board_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                self.state.interaction_mode = InteractionMode::Confirm(ConfirmDialog::quit());
            }
            KeyCode::Char('?') => {
                self.state.interaction_mode = InteractionMode::Help;
            }

            // === Task list navigation (cursor follows selection) ===
            KeyCode::Up | KeyCode::Char('k') => {
                self.state.move_cursor(-1);
                self.select_cursor();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.state.move_cursor(1);
                self.select_cursor();
            }
            KeyCode::Char('g') => {
                self.state.cursor_to_first();
                self.select_cursor();
            }
            KeyCode::Char('G') => {
                self.state.cursor_to_last();
                self.select_cursor();
            }
            KeyCode::Enter => {
                self.select_cursor();
            }
            KeyCode::Esc => {
                if self.state.session.selected_id().is_some()
                    && let Err(e) = self.state.session.select_task(None)
                {
                    self.state.set_error(e.to_string());
                }
            }

            // === Execution controls (AI tasks) ===
            KeyCode::Char('m') => {
                let next = match self.state.session.mode() {
                    ExecutionMode::Text => ExecutionMode::Image,
                    ExecutionMode::Image => ExecutionMode::Text,
                };
                if let Err(e) = self.state.session.set_mode(next) {
                    self.state.set_error(e.to_string());
                }
            }
            KeyCode::Char('a') => {
                if self.state.session.mode() == ExecutionMode::Image {
                    let mut config = self.state.session.image_config();
                    config.aspect_ratio = config.aspect_ratio.cycled();
                    if let Err(e) = self.state.session.set_image_config(config) {
                        self.state.set_error(e.to_string());
                    }
                }
            }
            KeyCode::Char('s') => {
                if self.state.session.mode() == ExecutionMode::Image {
                    let mut config = self.state.session.image_config();
                    config.size = config.size.cycled();
                    if let Err(e) = self.state.session.set_image_config(config) {
                        self.state.set_error(e.to_string());
                    }
                }
            }
            KeyCode::Char('e') => {
                // Queued for the runner, which owns the gateway handle
                match self.state.session.selected_task() {
                    Some(task) if task.executor.is_ai() => {
                        self.state.pending_execute = true;
                    }
                    Some(_) => self.state.set_error("Only AI tasks can be executed; press c to mark done"),
                    None => self.state.set_error("Select a task first"),
                }
            }

            // === Manual completion (HUMAN/TOOL tasks) ===
            KeyCode::Char('c') => {
                match self.state.session.selected_id().cloned() {
                    Some(id) => {
                        if let Err(e) = self.state.session.mark_completed(&id) {
                            self.state.set_error(e.to_string());
                        }
                    }
                    None => self.state.set_error("Select a task first"),
                }
            }

            // === Restart (irreversible) ===
            KeyCode::Char('r') => {
                self.state.interaction_mode = InteractionMode::Confirm(ConfirmDialog::restart());
            }

            // === Detail pane scrolling ===
            KeyCode::PageDown => {
                self.state.detail_scroll = self.state.detail_scroll.saturating_add(5);
            }
            KeyCode::PageUp => {
                self.state.detail_scroll = self.state.detail_scroll.saturating_sub(5);
            }

            _ => {}
        }
    }

    /// Select the task under the cursor
    fn select_cursor(&mut self) {
        if let Some(id) = self.state.id_at_cursor()
            && let Err(e) = self.state.session.select_task(Some(id))
        {
            self.state.set_error(e.to_string());
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.state.interaction_mode = InteractionMode::Normal;
            }
            KeyCode::Enter => {
                if let InteractionMode::Confirm(dialog) = &self.state.interaction_mode
                    && dialog.selected_button
                {
                    let action = dialog.action;
                    self.state.interaction_mode = InteractionMode::Normal;
                    return self.run_confirmed(action);
                }
                self.state.interaction_mode = InteractionMode::Normal;
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let InteractionMode::Confirm(dialog) = &mut self.state.interaction_mode {
                    if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                        dialog.selected_button = true;
                    } else {
                        dialog.selected_button = !dialog.selected_button;
                    }
                }
            }
            _ => {}
        }

        false
    }

    /// Perform a confirmed irreversible action
    fn run_confirmed(&mut self, action: ConfirmAction) -> bool {
        match action {
            ConfirmAction::Quit => {
                self.state.should_quit = true;
                true
            }
            ConfirmAction::Restart => {
                match self.state.session.restart() {
                    Ok(()) => {
                        self.state.idea_input.clear();
                        self.state.cursor = 0;
                        self.state.detail_scroll = 0;
                    }
                    Err(e) => self.state.set_error(e.to_string()),
                }
                false
            }
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::F(1) => {
                self.state.interaction_mode = InteractionMode::Normal;
            }
            _ => {}
        }
        false
    }
}
