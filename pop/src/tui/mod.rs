//! Terminal user interface
//!
//! Two screens: the idea input hero (Idle/Decomposing) and the plan board
//! (task tree on the left, task detail card on the right). The TUI forwards
//! user intents to the session controller and renders whatever state it
//! holds; it keeps no plan state of its own.

mod app;
mod events;
mod runner;
pub mod state;
mod views;

pub use app::App;
pub use events::{Event, EventHandler};
pub use runner::StudioRunner;
pub use state::{AppState, InteractionMode};

use std::io::{self, Stdout};
use std::sync::Arc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use eyre::Result;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::gateway::PlanGateway;

/// Terminal type alias
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Run the studio TUI against the given gateway
pub async fn run(gateway: Arc<dyn PlanGateway>) -> Result<()> {
    let terminal = init()?;

    // Restore the terminal even on early return or error
    struct TerminalGuard;
    impl Drop for TerminalGuard {
        fn drop(&mut self) {
            let _ = restore();
        }
    }
    let _guard = TerminalGuard;

    let mut runner = StudioRunner::new(terminal, gateway);
    runner.run().await
}
