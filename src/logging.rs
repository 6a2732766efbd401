//! Logging bootstrap.
//!
//! One-shot commands log to stderr. The terminal UI owns the screen, so while
//! it runs logs go to a file in the data directory instead, or nowhere when
//! the session has no data directory.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use env_logger::{Builder, Env, Target};

/// Where a session's log records end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    File,
    Discard,
}

impl LogDestination {
    /// Pick the destination for a session. Anything that draws the UI must
    /// keep stderr quiet.
    pub fn for_session(is_ui: bool, ephemeral: bool) -> Self {
        match (is_ui, ephemeral) {
            (false, _) => LogDestination::Stderr,
            (true, false) => LogDestination::File,
            (true, true) => LogDestination::Discard,
        }
    }
}

fn builder(verbose: bool) -> Builder {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));
    builder.format_timestamp_millis();
    builder
}

/// Log to stderr.
pub fn init_stderr(verbose: bool) {
    let _ = builder(verbose).target(Target::Stderr).try_init();
}

/// Install a logger that drops every record.
pub fn init_discard(verbose: bool) {
    let _ = builder(verbose)
        .target(Target::Pipe(Box::new(io::sink())))
        .write_style(env_logger::WriteStyle::Never)
        .try_init();
}

/// Append logs to `path`, creating parent directories as needed.
pub fn init_file(path: &Path, verbose: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = builder(verbose)
        .target(Target::Pipe(Box::new(file)))
        .write_style(env_logger::WriteStyle::Never)
        .try_init();
    Ok(())
}
