//! Main application logic for the terminal user interface.
//!
//! `App` owns the `TaskListStore`, forwards key presses to store operations
//! and re-renders from `tasks()` and `edit_mode()` after every event.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};

use crate::storage::KeyValueStore;
use crate::store::{EditMode, TaskListStore};
use crate::tui::colors::{DEEP_GREEN, GREEN, MUTED, PURPLE, RED};
use crate::tui::enums::Focus;
use crate::tui::input::InputField;

/// Single-screen task list UI state.
pub struct App<S: KeyValueStore + 'static> {
    store: TaskListStore<S>,
    focus: Focus,
    input: InputField,
    draft: InputField,
    list_state: ListState,
    status_message: String,
}

impl<S: KeyValueStore + 'static> App<S> {
    pub fn new(store: TaskListStore<S>) -> Self {
        let mut list_state = ListState::default();
        if !store.is_empty() {
            list_state.select(Some(0));
        }
        App {
            store,
            focus: Focus::Input,
            input: InputField::new(),
            draft: InputField::new(),
            list_state,
            status_message: String::new(),
        }
    }

    #[cfg(test)]
    fn store(&self) -> &TaskListStore<S> {
        &self.store
    }

    /// Hand the store back, e.g. to flush pending writes on exit.
    pub fn into_store(self) -> TaskListStore<S> {
        self.store
    }

    #[cfg(test)]
    fn focus(&self) -> Focus {
        self.focus
    }

    #[cfg(test)]
    fn input(&self) -> &InputField {
        &self.input
    }

    #[cfg(test)]
    fn status_message(&self) -> &str {
        &self.status_message
    }

    fn selected_id(&self) -> Option<u64> {
        let idx = self.list_state.selected()?;
        self.store.tasks().get(idx).map(|t| t.id)
    }

    fn clamp_selection(&mut self) {
        let len = self.store.len();
        match self.list_state.selected() {
            _ if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            None => self.list_state.select(Some(0)),
            _ => {}
        }
    }

    /// Apply one key press. Returns true if the application should quit.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            return true;
        }
        if matches!(self.store.edit_mode(), EditMode::Editing { .. }) {
            self.handle_edit_input(code);
            return false;
        }
        match self.focus {
            Focus::Input => self.handle_entry_input(code),
            Focus::List => self.handle_list_input(code),
        }
    }

    fn handle_entry_input(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Enter => match self.store.add(&self.input.value) {
                Some(_) => {
                    self.input.clear();
                    self.list_state.select(Some(self.store.len() - 1));
                    self.status_message = "Task added.".to_string();
                }
                None => {
                    self.status_message = "Type something first.".to_string();
                }
            },
            KeyCode::Tab | KeyCode::Down | KeyCode::Esc => {
                self.focus = self.focus.toggled();
                self.clamp_selection();
            }
            KeyCode::Char(c) => self.input.handle_char(c),
            KeyCode::Backspace => self.input.handle_backspace(),
            KeyCode::Delete => self.input.handle_delete(),
            KeyCode::Left => self.input.move_cursor_left(),
            KeyCode::Right => self.input.move_cursor_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            _ => {}
        }
        false
    }

    fn handle_list_input(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::Char('a') | KeyCode::Char('i') => {
                self.focus = Focus::Input;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(i) = self.list_state.selected() {
                    if i > 0 {
                        self.list_state.select(Some(i - 1));
                    } else {
                        self.focus = Focus::Input;
                    }
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(i) = self.list_state.selected() {
                    if i + 1 < self.store.len() {
                        self.list_state.select(Some(i + 1));
                    }
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('x') => {
                if let Some(id) = self.selected_id() {
                    self.store.toggle_completion(id);
                }
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    if self.store.start_edit(id) {
                        let draft = self.store.edit_mode().draft().unwrap_or_default();
                        self.draft = InputField::with_value(draft);
                    }
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id() {
                    self.store.delete(id);
                    self.clamp_selection();
                    self.status_message = "Task deleted.".to_string();
                }
            }
            _ => {}
        }
        false
    }

    fn handle_edit_input(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                self.store.save_edit();
                self.draft.clear();
                self.status_message = "Task updated.".to_string();
                return;
            }
            KeyCode::Esc => {
                self.store.cancel_edit();
                self.draft.clear();
                return;
            }
            KeyCode::Char(c) => self.draft.handle_char(c),
            KeyCode::Backspace => self.draft.handle_backspace(),
            KeyCode::Delete => self.draft.handle_delete(),
            KeyCode::Left => self.draft.move_cursor_left(),
            KeyCode::Right => self.draft.move_cursor_right(),
            KeyCode::Home => self.draft.move_home(),
            KeyCode::End => self.draft.move_end(),
            _ => return,
        }
        self.store.set_draft(&self.draft.value);
    }

    /// Poll for and handle keyboard events.
    ///
    /// Returns true if the application should quit.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(false);
                }
                self.status_message.clear();
                return Ok(self.handle_key(key.code, key.modifiers));
            }
        }
        Ok(false)
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let header_text = vec![Line::from(vec![
            Span::styled("TASKS", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("{} of {} remaining", self.store.remaining(), self.store.len()),
                Style::default().add_modifier(Modifier::ITALIC),
            ),
        ])];
        let header = Paragraph::new(header_text)
            .style(Style::default().bg(DEEP_GREEN).fg(Color::White))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_entry(&self, f: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Input && self.store.edit_mode() == &EditMode::Idle;
        let border = if focused { PURPLE } else { MUTED };
        let entry = Paragraph::new(self.input.value.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(" Add a task "),
        );
        f.render_widget(entry, area);
        if focused {
            f.set_cursor_position((area.x + 1 + self.input.cursor as u16, area.y + 1));
        }
    }

    fn render_list(&mut self, f: &mut Frame, area: Rect) {
        let editing = self.store.edit_mode().editing_id();
        let items: Vec<ListItem> = self
            .store
            .tasks()
            .iter()
            .map(|t| {
                if editing == Some(t.id) {
                    return ListItem::new(Line::from(vec![
                        Span::styled("✎ ", Style::default().fg(PURPLE)),
                        Span::styled(
                            self.draft.value.clone(),
                            Style::default().add_modifier(Modifier::UNDERLINED),
                        ),
                    ]));
                }
                let (mark, style) = if t.completed {
                    ("[x] ", Style::default().fg(MUTED).add_modifier(Modifier::CROSSED_OUT))
                } else {
                    ("[ ] ", Style::default())
                };
                let mark_color = if t.completed { MUTED } else { GREEN };
                ListItem::new(Line::from(vec![
                    Span::styled(mark, Style::default().fg(mark_color)),
                    Span::styled(t.title.clone(), style),
                ]))
            })
            .collect();

        let border = if self.focus == Focus::List || editing.is_some() { PURPLE } else { MUTED };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(" List "),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_stateful_widget(list, area, &mut self.list_state);

        if let Some(id) = editing {
            if let Some(row) = self.store.tasks().iter().position(|t| t.id == id) {
                let row = row.saturating_sub(self.list_state.offset()) as u16;
                let x = area.x + 1 + 2 + self.draft.cursor as u16;
                f.set_cursor_position((x, area.y + 1 + row));
            }
        }
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let hints: Vec<Span> = match (self.store.edit_mode(), self.focus) {
            (EditMode::Editing { .. }, _) => vec![
                Span::styled(" Enter ", Style::default().bg(PURPLE).fg(Color::White)),
                Span::raw(" save  "),
                Span::styled(" Esc ", Style::default().bg(RED).fg(Color::White)),
                Span::raw(" cancel"),
            ],
            (EditMode::Idle, Focus::Input) => vec![
                Span::styled(" Enter ", Style::default().bg(PURPLE).fg(Color::White)),
                Span::raw(" add  "),
                Span::styled(" Tab ", Style::default().bg(MUTED).fg(Color::White)),
                Span::raw(" list  "),
                Span::styled(" Ctrl-C ", Style::default().bg(MUTED).fg(Color::White)),
                Span::raw(" quit"),
            ],
            (EditMode::Idle, Focus::List) => vec![
                Span::styled(" Space ", Style::default().bg(GREEN).fg(Color::White)),
                Span::raw(" toggle  "),
                Span::styled(" e ", Style::default().bg(PURPLE).fg(Color::White)),
                Span::raw(" edit  "),
                Span::styled(" d ", Style::default().bg(RED).fg(Color::White)),
                Span::raw(" delete  "),
                Span::styled(" Tab ", Style::default().bg(MUTED).fg(Color::White)),
                Span::raw(" add  "),
                Span::styled(" q ", Style::default().bg(MUTED).fg(Color::White)),
                Span::raw(" quit"),
            ],
        };
        let mut spans = hints;
        if !self.status_message.is_empty() {
            spans.push(Span::raw("   "));
            spans.push(Span::styled(
                self.status_message.clone(),
                Style::default().fg(Color::Yellow),
            ));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    /// Render the whole screen.
    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_entry(f, chunks[1]);
        self.render_list(f, chunks[2]);
        self.render_status_bar(f, chunks[3]);
    }

    /// Main event loop for the TUI application.
    ///
    /// Handles rendering and input processing until the user exits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}
