//! Terminal User Interface module using ratatui

mod app;
mod components;
mod events;
mod keys;
mod styles;

use anyhow::Result;
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::time::Duration;
use tracing::info;

use crate::{app::ChatHeader, session::TurnHandler};
use app::ChatApp;
use events::EventHandler;

pub type Backend = CrosstermBackend<io::Stdout>;
pub type Frame<'a> = ratatui::Frame<'a>;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Leave raw mode and the alternate screen without a `Terminal` handle, for the panic hook
pub fn reset_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)
}

/// Main TUI entry point
pub async fn run(header: ChatHeader, handler: TurnHandler) -> Result<()> {
    let mut terminal = init_terminal()?;
    let mut event_handler = EventHandler::new(TICK_INTERVAL);
    let mut app = ChatApp::new(header, handler, event_handler.sender());

    let result = run_app(&mut terminal, &mut app, &mut event_handler).await;

    restore_terminal(&mut terminal)?;

    let stats = app.handler().session().stats();
    info!(
        "Session ended after {} turns in {}s ({} unanswered)",
        stats.total_turns,
        stats.elapsed_secs,
        stats.unanswered()
    );
    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Terminal<Backend>,
    app: &mut ChatApp,
    event_handler: &mut EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        match event_handler.next().await {
            Some(event) => {
                if app.handle_event(event) {
                    break; // Exit requested
                }
            }
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_terminal_outside_raw_mode() {
        assert!(reset_terminal().is_ok());
        assert!(!crossterm::terminal::is_raw_mode_enabled().unwrap());
    }
}
