// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! brook - micro-batch streaming jobs

mod commands;
mod job;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{reset, run, wal};

#[derive(Parser)]
#[command(
    name = "brook",
    version,
    about = "brook runs micro-batch streaming jobs with checkpointed state"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job file until its source is exhausted or the job is interrupted
    Run(run::RunArgs),
    /// Show the write-ahead log of a checkpoint directory
    Wal(wal::WalArgs),
    /// Drop the operator state of a checkpoint directory
    Reset(reset::ResetArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Wal(args) => wal::wal(args),
        Commands::Reset(args) => reset::reset(args),
    }
}

// Logs go to stderr; stdout belongs to the console sink
fn setup_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
