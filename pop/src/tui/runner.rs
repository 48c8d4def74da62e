//! TUI runner - owns the terminal, the app, and the gateway handle
//!
//! The runner drives the main loop: render, handle events, and on each tick
//! start queued remote operations and fold finished ones back into the
//! session. Remote calls run on spawned tokio tasks and report through an
//! mpsc channel, so the UI never blocks on the network.

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{ResultKind, TaskDraft, TaskId};
use crate::gateway::{GatewayError, PlanGateway};
use crate::session::{ExecutionMode, ExecutionOutcome, ExecutionRequest, SessionError};

use super::Tui;
use super::app::App;
use super::events::{Event, EventHandler};
use super::views;

/// Outcome of a spawned gateway call, delivered back to the main loop
#[derive(Debug)]
enum GatewayOutcome {
    Decomposed(Result<Vec<TaskDraft>, GatewayError>),
    Executed {
        task: TaskId,
        outcome: Result<ExecutionOutcome, GatewayError>,
    },
}

/// TUI runner that manages the terminal and event loop
pub struct StudioRunner {
    app: App,
    terminal: Tui,
    gateway: Arc<dyn PlanGateway>,
    event_handler: EventHandler,
    outcome_tx: mpsc::Sender<GatewayOutcome>,
    outcome_rx: mpsc::Receiver<GatewayOutcome>,
}

impl StudioRunner {
    pub fn new(terminal: Tui, gateway: Arc<dyn PlanGateway>) -> Self {
        // One in-flight call at a time, so a small buffer is plenty
        let (outcome_tx, outcome_rx) = mpsc::channel(8);
        Self {
            app: App::new(),
            terminal,
            gateway,
            event_handler: EventHandler::new(Duration::from_millis(33)), // ~30 FPS
            outcome_tx,
            outcome_rx,
        }
    }

    /// Run the TUI main loop
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.terminal.draw(|frame| views::render(self.app.state(), frame))?;

            match self.event_handler.next().await? {
                Event::Tick => self.handle_tick(),
                Event::Key(key_event) => {
                    if self.app.handle_key(key_event) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
            }

            if self.app.state().should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Periodic work: fold in finished calls, start queued ones
    fn handle_tick(&mut self) {
        // Collect first to avoid holding the receiver borrow while mutating
        let outcomes: Vec<GatewayOutcome> = std::iter::from_fn(|| self.outcome_rx.try_recv().ok()).collect();
        for outcome in outcomes {
            self.process_outcome(outcome);
        }

        if let Some(idea) = self.app.state_mut().pending_submit.take() {
            self.start_decompose(idea);
        }

        if std::mem::take(&mut self.app.state_mut().pending_execute) {
            self.start_execute();
        }
    }

    /// Kick off the decomposition call
    fn start_decompose(&mut self, idea: String) {
        let state = self.app.state_mut();
        if let Err(e) = state.session.submit_idea(&idea) {
            state.set_error(e.to_string());
            return;
        }
        state.start_working();
        info!(idea_len = idea.len(), "start_decompose: spawning gateway call");

        let gateway = self.gateway.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = gateway.decompose(&idea).await;
            if tx.send(GatewayOutcome::Decomposed(result)).await.is_err() {
                warn!("start_decompose: runner dropped before outcome delivery");
            }
        });
    }

    /// Kick off a task execution call
    fn start_execute(&mut self) {
        let state = self.app.state_mut();
        let request = match state.session.begin_execute() {
            Ok(request) => request,
            Err(e) => {
                state.set_error(e.to_string());
                return;
            }
        };
        state.start_working();
        info!(task = %request.task, mode = %request.mode, "start_execute: spawning gateway call");

        let gateway = self.gateway.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let ExecutionRequest {
                task, prompt, mode, image,
            } = request;
            let outcome = match mode {
                ExecutionMode::Text => gateway.execute_text(&prompt).await.map(|result| ExecutionOutcome {
                    result,
                    kind: ResultKind::Text,
                }),
                ExecutionMode::Image => {
                    gateway
                        .execute_image(&prompt, &image)
                        .await
                        .map(|image| ExecutionOutcome {
                            result: image.into_uri(),
                            kind: ResultKind::Image,
                        })
                }
            };
            if tx.send(GatewayOutcome::Executed { task, outcome }).await.is_err() {
                warn!("start_execute: runner dropped before outcome delivery");
            }
        });
    }

    /// Fold a finished gateway call back into the session
    fn process_outcome(&mut self, outcome: GatewayOutcome) {
        let state = self.app.state_mut();
        state.stop_working();

        match outcome {
            GatewayOutcome::Decomposed(result) => match state.session.complete_decompose(result) {
                Ok(()) => {
                    debug!("process_outcome: plan ready");
                    // The idea made it into the plan; a fresh input greets
                    // the next restart.
                    state.idea_input.clear();
                    state.cursor = 0;
                }
                Err(e) => {
                    // Back on the input screen with the idea text intact
                    warn!(error = %e, "process_outcome: decomposition failed");
                    state.set_error(e.to_string());
                }
            },
            GatewayOutcome::Executed { task, outcome } => {
                if let Err(e) = state.session.complete_execute(&task, outcome) {
                    warn!(%task, error = %e, "process_outcome: execution failed");
                    match &e {
                        SessionError::Gateway(g) if g.is_retryable() => {
                            state.set_error(format!("{} (e to retry)", e));
                        }
                        _ => state.set_error(e.to_string()),
                    }
                }
            }
        }
    }
}
