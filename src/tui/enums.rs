//! Enumerations for TUI state management.

/// Which widget receives plain key presses when no edit is in progress.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Focus {
    Input,
    List,
}

impl Focus {
    pub fn toggled(self) -> Self {
        match self {
            Focus::Input => Focus::List,
            Focus::List => Focus::Input,
        }
    }
}
