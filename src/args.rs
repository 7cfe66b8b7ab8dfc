use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

/// Easel - MCP server for image-generation prompt templates.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Template store directory (defaults to the platform data dir).
    #[arg(long = "store-dir", value_name = "DIR", global = true)]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the MCP server over stdio.
    ///
    /// This is the default when no subcommand is given.
    Serve,

    /// List stored templates.
    #[command(visible_alias = "ls")]
    List,

    /// Install the built-in starter templates.
    Seed,
}

/// Parse command line arguments.
pub fn get_cli() -> Cli {
    Cli::parse()
}

/// Map `-v` counts to the appropriate log level.
pub fn get_log_level_from_verbose(verbose_count: u8) -> LevelFilter {
    match verbose_count {
        0 => LevelFilter::Error,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
