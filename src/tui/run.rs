//! TUI entry point and terminal setup.

use std::io;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::storage::KeyValueStore;
use crate::store::TaskListStore;
use crate::tui::app::App;

/// Initialise and run the terminal user interface.
/// Returns the store so the caller can flush outstanding writes.
pub fn run_tui<S: KeyValueStore + 'static>(
    store: TaskListStore<S>,
) -> io::Result<TaskListStore<S>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store);
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    Ok(app.into_store())
}
