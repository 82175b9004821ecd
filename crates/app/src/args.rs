pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bulletin")]
#[command(about = "Store and read content-addressed data on Bulletin Chain")]
#[command(version)]
pub struct Args {
    /// Path to the bulletin config directory (defaults to ~/.bulletin)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: crate::Command,
}
