//! Command implementations for the CLI interface.
//!
//! Each handler runs one store operation against an already loaded
//! `TaskListStore` and reports to the given writer. Lookup failures come back
//! as `Err(message)`; the store itself never fails.

use std::io::{self, Write};

use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::storage::KeyValueStore;
use crate::store::TaskListStore;
use crate::task::Task;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive UI (the default).
    Ui,

    /// Add a new task.
    Add {
        /// Task text. Leading and trailing whitespace is dropped.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List all tasks in insertion order.
    List,

    /// Flip a task between open and done.
    Toggle {
        /// Task ID or title
        task: String,
    },

    /// Delete a task.
    Delete {
        /// Task ID or title
        task: String,
    },

    /// Replace a task's title.
    Edit {
        /// Task ID or title
        task: String,
        /// New title, stored exactly as given.
        #[arg(num_args = 0..)]
        title: Vec<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Outcome of a command that needs to name a task.
pub type CmdResult = Result<(), String>;

pub fn cmd_add<S: KeyValueStore + 'static>(
    store: &mut TaskListStore<S>,
    text: &[String],
    out: &mut impl Write,
) -> io::Result<()> {
    let text = text.join(" ");
    match store.add(&text) {
        Some(id) => writeln!(out, "Added task {id}."),
        None => writeln!(out, "Nothing added: the task text is blank."),
    }
}

pub fn cmd_list<S: KeyValueStore + 'static>(
    store: &TaskListStore<S>,
    out: &mut impl Write,
) -> io::Result<()> {
    if store.is_empty() {
        return writeln!(out, "No tasks yet.");
    }
    print_table(store.tasks(), out)?;
    writeln!(out, "{} of {} remaining", store.remaining(), store.len())
}

pub fn cmd_toggle<S: KeyValueStore + 'static>(
    store: &mut TaskListStore<S>,
    task: &str,
    out: &mut impl Write,
) -> io::Result<CmdResult> {
    let id = match resolve_task_identifier(task, store.tasks()) {
        Ok(id) => id,
        Err(e) => return Ok(Err(e)),
    };
    store.toggle_completion(id);
    let state = match store.get(id) {
        Some(t) if t.completed => "done",
        _ => "open",
    };
    writeln!(out, "Task {id} is now {state}.")?;
    Ok(Ok(()))
}

pub fn cmd_delete<S: KeyValueStore + 'static>(
    store: &mut TaskListStore<S>,
    task: &str,
    out: &mut impl Write,
) -> io::Result<CmdResult> {
    let id = match resolve_task_identifier(task, store.tasks()) {
        Ok(id) => id,
        Err(e) => return Ok(Err(e)),
    };
    store.delete(id);
    writeln!(out, "Deleted task {id}.")?;
    Ok(Ok(()))
}

/// Edit through the same start / draft / save path the UI uses.
pub fn cmd_edit<S: KeyValueStore + 'static>(
    store: &mut TaskListStore<S>,
    task: &str,
    title: &[String],
    out: &mut impl Write,
) -> io::Result<CmdResult> {
    let id = match resolve_task_identifier(task, store.tasks()) {
        Ok(id) => id,
        Err(e) => return Ok(Err(e)),
    };
    store.start_edit(id);
    store.set_draft(&title.join(" "));
    store.save_edit();
    writeln!(out, "Updated task {id}.")?;
    Ok(Ok(()))
}

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Resolve a task identifier (either ID or title) to a task ID.
/// A number that is not a known ID is tried as a title.
/// Returns an error if the title has multiple matches and suggests using the ID instead.
pub fn resolve_task_identifier(identifier: &str, tasks: &[Task]) -> Result<u64, String> {
    let numeric = identifier.trim().parse::<u64>().ok();
    if let Some(id) = numeric {
        if tasks.iter().any(|t| t.id == id) {
            return Ok(id);
        }
    }

    let wanted = identifier.trim().to_lowercase();
    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.title.trim().to_lowercase() == wanted)
        .collect();

    match matches.len() {
        0 => match numeric {
            Some(id) => Err(format!("Task with ID {} not found", id)),
            None => Err(format!("No task found with title '{}'", identifier)),
        },
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple tasks found with title '{}':\n", identifier);
            for task in matches {
                error_msg.push_str(&format!("  ID {}: {}\n", task.id, task.title));
            }
            error_msg.push_str("Please use the specific ID instead.");
            Err(error_msg)
        }
    }
}

/// Print tasks as a table in list order.
pub fn print_table(tasks: &[Task], out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{:<14} {:<4} {}", "ID", "Done", "Title")?;
    for t in tasks {
        let mark = if t.completed { "[x]" } else { "[ ]" };
        writeln!(out, "{:<14} {:<4} {}", t.id, mark, truncate(&t.title, 60))?;
    }
    Ok(())
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}
