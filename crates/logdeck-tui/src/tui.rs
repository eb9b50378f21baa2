//! Terminal session lifecycle
//!
//! Raw mode and the alternate screen are entered through [`TuiGuard`]; the
//! guard restores the shell when dropped and from the panic hook, so a
//! crash mid-draw never leaves the terminal in raw mode.

use color_eyre::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Active terminal session; dropping it restores the shell
pub struct TuiGuard {
    pub terminal: Tui,
    mouse: bool,
}

impl TuiGuard {
    /// Enter raw mode and the alternate screen
    ///
    /// Mouse capture is opt-in; with it off the terminal keeps native text
    /// selection and the wheel scrolls the scrollback instead of the list.
    pub fn enter(mouse: bool) -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnterAlternateScreen)?;
        if mouse {
            crossterm::execute!(stdout, EnableMouseCapture)?;
        }
        install_panic_restore(mouse);
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal, mouse })
    }
}

impl Drop for TuiGuard {
    fn drop(&mut self) {
        if let Err(error) = leave(self.mouse) {
            tracing::error!(%error, "terminal restore failed");
        }
    }
}

/// Undo everything `enter` set up; safe to run more than once
fn leave(mouse: bool) -> Result<()> {
    if mouse {
        crossterm::execute!(io::stdout(), DisableMouseCapture)?;
    }
    crossterm::execute!(io::stdout(), LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    Ok(())
}

/// Chain a terminal restore in front of the existing panic hook
fn install_panic_restore(mouse: bool) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = leave(mouse);
        previous(panic_info);
    }));
}
