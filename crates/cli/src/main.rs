// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover: run an external analysis tool over a batch of work items.

mod color;
mod commands;
mod env;
mod exit_error;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::consolidate::ConsolidateArgs;
use commands::run::RunArgs;
use commands::status::StatusArgs;
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "drover",
    version,
    about = "Resumable batch runner for external analysis tools",
    styles = color::styles()
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the tool over every queued item of an input list
    Run(Box<RunArgs>),
    /// Show completed and failed counts from the state files
    Status(StatusArgs),
    /// Merge result artifacts of completed items into results_all.csv
    Consolidate(ConsolidateArgs),
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => commands::run::handle(*args, cli.format).await,
        Command::Status(args) => commands::status::handle(args, cli.format),
        Command::Consolidate(args) => commands::consolidate::handle(args, cli.format),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli).await {
        match err.downcast_ref::<ExitError>() {
            Some(exit) => eprintln!("drover: {exit}"),
            None => eprintln!("drover: {err:#}"),
        }
        std::process::exit(exit_error::exit_code(&err));
    }
}
