use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Single-screen task list.
/// Storage defaults to ~/.tasklist or a directory passed via --dir.
#[derive(Parser)]
#[command(name = "tl", version, about = "Small persistent task list")]
pub struct Cli {
    /// Directory holding the task list and config.json.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Never let an older snapshot overwrite a newer one.
    #[arg(long, global = true)]
    pub ordered_writes: bool,

    /// Keep the list in memory only for this run.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
