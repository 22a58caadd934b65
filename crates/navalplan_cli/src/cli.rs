//! Command-line surface of the `navalplan` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Top-level CLI parser.
#[derive(Debug, Parser)]
#[command(name = "navalplan", version, about = "NavalPlan order planning tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// SQLite database file
    #[arg(long, global = true, env = "NAVALPLAN_DB", default_value = "navalplan.sqlite3")]
    pub db: PathBuf,

    /// Log level: trace, debug, info, warn, error; only used together with --log-dir
    #[arg(long, global = true, env = "NAVALPLAN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "NAVALPLAN_LOG_DIR")]
    pub log_dir: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check core linkage.
    Ping,
    /// Print the core version.
    Version,
    /// Label type maintenance.
    LabelTypes {
        #[command(subcommand)]
        action: LabelTypeCommands,
    },
    /// Order element inspection.
    Order {
        #[command(subcommand)]
        action: OrderCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum LabelTypeCommands {
    /// List label types by name.
    List,
    /// Create a label type.
    Add { name: String },
    /// Rename an existing label type.
    Rename { id: Uuid, name: String },
    /// Report whether a new label type could use the name.
    Check { name: String },
}

#[derive(Debug, Subcommand)]
pub enum OrderCommands {
    /// List root order elements.
    List,
    /// Print the hours group grid of one order element as JSON.
    Show {
        id: Uuid,
        /// Criterion type names to aggregate container hours groups by;
        /// defaults to every type found on the hours groups
        #[arg(long = "group-by")]
        group_by: Vec<String>,
    },
}
