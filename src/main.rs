//! # TL - a small persistent task list
//!
//! Add, edit, complete and delete short text tasks from a single-screen
//! terminal UI or straight from the shell. The whole list is kept in memory
//! and mirrored, after every change, as one JSON snapshot under a fixed key
//! in a local key-value store (`~/.tasklist/tasks.json` by default).
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the UI
//! tl
//!
//! # Or work from the shell
//! tl add Buy milk
//! tl list
//! tl toggle "buy milk"
//! tl edit 1718000000000 Buy oat milk
//! tl delete 1718000000000
//! ```
//!
//! A missing or corrupted snapshot never stops the app: it starts with an
//! empty list and logs what went wrong. Writes happen in the background and
//! failures are logged, never shown.

use std::io;
use std::sync::Arc;

use clap::Parser;
use log::{error, warn};

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod logging;
pub mod persist;
pub mod storage;
pub mod store;
pub mod task;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
}

use cli::Cli;
use cmd::*;
use config::{resolve_data_dir, Config};
use logging::LogDestination;
use storage::{FileStore, KeyValueStore, MemoryStore};
use store::{StoreOptions, TaskListStore};

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Ui);

    if let Commands::Completions { shell } = command {
        cmd_completions(shell);
        return;
    }

    let data_dir = resolve_data_dir(cli.dir.as_deref());
    let config = Config::load(&data_dir);

    let is_ui = matches!(command, Commands::Ui);
    match LogDestination::for_session(is_ui, cli.ephemeral) {
        LogDestination::Stderr => logging::init_stderr(cli.verbose),
        LogDestination::Discard => logging::init_discard(cli.verbose),
        LogDestination::File => {
            let log_path = match &config {
                Ok(c) => c.log_path(&data_dir),
                Err(_) => Config::default().log_path(&data_dir),
            };
            if let Err(e) = logging::init_file(&log_path, cli.verbose) {
                eprintln!("Failed to open log file {}: {e}", log_path.display());
                logging::init_discard(cli.verbose);
            }
        }
    }

    let config = config.unwrap_or_else(|e| {
        warn!("{e}; using defaults");
        Config::default()
    });
    let mut options = config.store_options();
    options.ordered_writes |= cli.ordered_writes;

    let code = if cli.ephemeral {
        run(command, Arc::new(MemoryStore::new()), options)
    } else {
        match FileStore::open(&data_dir) {
            Ok(kv) => run(command, Arc::new(kv), options),
            Err(e) => {
                eprintln!("Failed to open data directory {}: {e}", data_dir.display());
                1
            }
        }
    };
    std::process::exit(code);
}

/// Load the store, dispatch the command and flush pending writes.
/// Returns the process exit code.
fn run<S: KeyValueStore + 'static>(command: Commands, kv: Arc<S>, options: StoreOptions) -> i32 {
    let mut store = TaskListStore::load(kv, options);
    let mut stdout = io::stdout();

    let outcome: io::Result<CmdResult> = match command {
        Commands::Ui => match tui::run::run_tui(store) {
            Ok(s) => {
                store = s;
                Ok(Ok(()))
            }
            Err(e) => {
                eprintln!("UI error: {e}");
                error!("UI error: {e}");
                return 1;
            }
        },
        Commands::Add { text } => cmd_add(&mut store, &text, &mut stdout).map(Ok),
        Commands::List => cmd_list(&store, &mut stdout).map(Ok),
        Commands::Toggle { task } => cmd_toggle(&mut store, &task, &mut stdout),
        Commands::Delete { task } => cmd_delete(&mut store, &task, &mut stdout),
        Commands::Edit { task, title } => cmd_edit(&mut store, &task, &title, &mut stdout),
        Commands::Completions { .. } => unreachable!("completions handled before loading"),
    };

    store.flush();
    report(outcome, store.persister().failed_writes())
}

fn report(outcome: io::Result<CmdResult>, failed_writes: usize) -> i32 {
    if failed_writes > 0 {
        warn!("{failed_writes} snapshot write(s) failed this session");
    }
    match outcome {
        Ok(Ok(())) => 0,
        Ok(Err(msg)) => {
            eprintln!("Error resolving task: {msg}");
            1
        }
        Err(e) => {
            eprintln!("Output error: {e}");
            1
        }
    }
}
