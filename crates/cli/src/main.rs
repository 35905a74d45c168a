// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! botfleet: operator CLI for the bot process supervisor.
//!
//! This is the thin controller boundary. It parses arguments and renders
//! results; all policy lives in `botfleet-engine`.

mod output;

use std::path::PathBuf;

use botfleet_core::Credential;
use botfleet_engine::{Runtime, RuntimeConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "botfleet",
    version,
    about = "Deploy and supervise bot workloads cloned from source repositories"
)]
struct Cli {
    /// State directory (registry, deployments, logs).
    /// Defaults to $BOTFLEET_STATE_DIR or ~/.botfleet.
    #[arg(long, global = true, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clone a workload from a repository and register it (stopped)
    Deploy {
        name: String,
        source_url: String,
        /// Secret handed to the workload via BOT_TOKEN
        credential: String,
        /// Script to launch, relative to the clone (default: main.py)
        #[arg(long)]
        entry_point: Option<String>,
    },
    /// Start a workload's process
    Start { name: String },
    /// Stop a workload's process (SIGTERM, then SIGKILL after grace)
    Stop { name: String },
    /// Stop then start, picking up updated code
    Restart { name: String },
    /// Pull the latest source and re-install dependencies
    Update { name: String },
    /// Stop, delete the work tree, and drop the registry entry
    Remove { name: String },
    /// Show one workload's reconciled status
    Status { name: String },
    /// List all workloads
    List,
    /// Show the tail of a workload's log
    Logs {
        name: String,
        /// Maximum lines to show
        #[arg(short = 'n', long = "lines", default_value_t = 20)]
        lines: usize,
    },
    /// Fleet-wide status counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.state_dir {
        Some(dir) => RuntimeConfig::new(dir),
        None => RuntimeConfig::from_env(),
    };
    tracing::debug!(state_dir = %config.state_dir.display(), "opening runtime");
    let runtime = Runtime::new(config)?;

    match cli.command {
        Command::Deploy {
            name,
            source_url,
            credential,
            entry_point,
        } => {
            let record = runtime
                .deploy(&name, &source_url, Credential::new(credential), entry_point)
                .await?;
            println!("deployed '{}' ({})", record.name, record.status);
        }
        Command::Start { name } => {
            let record = runtime.start(&name).await?;
            println!("{}", output::record_line(&record));
        }
        Command::Stop { name } => {
            let record = runtime.stop(&name).await?;
            println!("{}", output::record_line(&record));
        }
        Command::Restart { name } => {
            let record = runtime.restart(&name).await?;
            println!("{}", output::record_line(&record));
        }
        Command::Update { name } => {
            let record = runtime.update(&name).await?;
            println!("updated '{}', restart to pick up new code", record.name);
        }
        Command::Remove { name } => {
            runtime.remove(&name).await?;
            println!("removed '{name}'");
        }
        Command::Status { name } => {
            let record = runtime.status(&name).await?;
            print!("{}", output::record_details(&record));
        }
        Command::List => {
            print!("{}", output::table(&runtime.list()));
        }
        Command::Logs { name, lines } => {
            for line in runtime.tail_logs(&name, lines).await? {
                println!("{line}");
            }
        }
        Command::Stats => {
            println!("{}", output::stats_line(&runtime.stats()));
        }
    }

    Ok(())
}
