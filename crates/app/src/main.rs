// CLI modules
mod args;
mod op;
mod ops;
mod state;

use anyhow::Context;
use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Address, Authorize, Cat, Cid, Init, Renew, Upload, Version};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

command_enum! {
    (Address, Address),
    (Authorize, Authorize),
    (Cat, Cat),
    (Cid, Cid),
    (Init, Init),
    (Renew, Renew),
    (Upload, Upload),
    (Version, Version),
}

/// Logs go to stderr so stdout carries only command output.
fn init_logging(level: tracing::Level) -> anyhow::Result<WorkerGuard> {
    let (stderr_writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stderr_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .try_init()
        .context("failed to install log subscriber")?;
    Ok(guard)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let guard = match init_logging(args.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let ctx = op::OpContext::new(args.config_path);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {}", e);
            // exit skips destructors, flush logs first
            drop(guard);
            std::process::exit(1);
        }
    }
}
