//! CLI for the VDM task engine.
//!
//! This is a development harness around the embeddable engine: it feeds
//! scripted transport reports through the command surface and prints what a
//! download observer would see. Real frontends link `vdm-core` directly.

mod commands;
mod listener;
mod script;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vdm_core::config;

use commands::{run_config, run_demo, run_replay, run_status};

/// Top-level CLI for the VDM task engine.
#[derive(Debug, Parser)]
#[command(name = "vdm")]
#[command(about = "VDM: video download task engine harness", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Replay a JSON transport script against a fresh engine.
    Replay {
        /// Path to the script file (JSON array of steps).
        script: PathBuf,

        /// Where to persist task snapshots between runs.
        #[arg(long, default_value = "tasks.json", value_name = "FILE")]
        store: PathBuf,
    },

    /// Run a built-in scripted download end to end.
    Demo {
        /// Where to persist task snapshots between runs.
        #[arg(long, default_value = "tasks.json", value_name = "FILE")]
        store: PathBuf,
    },

    /// Show the tasks in the snapshot store.
    Status {
        /// Snapshot store to read.
        #[arg(long, default_value = "tasks.json", value_name = "FILE")]
        store: PathBuf,
    },

    /// Print the resolved engine configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Replay { script, store } => run_replay(&cfg, &script, &store).await?,
            CliCommand::Demo { store } => run_demo(&cfg, &store).await?,
            CliCommand::Status { store } => run_status(&store)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}
