//! `navalplan` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments, open the database and dispatch to `commands`.
//! - Report failures on stderr with a non-zero exit code.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.log_dir.is_none() && cli.log_level.is_some() {
        eprintln!("warning: --log-level is ignored without --log-dir");
    }
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli
            .log_level
            .as_deref()
            .unwrap_or_else(|| navalplan_core::default_log_level());
        navalplan_core::init_logging(level, log_dir).map_err(anyhow::Error::msg)?;
    }
    commands::dispatch(&cli)
}
