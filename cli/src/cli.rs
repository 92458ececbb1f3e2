//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Single-node k3s clusters on EC2
#[derive(Parser)]
#[command(
    name = "ec2-k3s",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Verbose logging to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Config file (default: ~/.ec2-k3s/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Launch an instance and install k3s on it
    Up(commands::up::UpArgs),

    /// Terminate the instance and delete its key pair and security group
    Down(commands::down::DownArgs),

    /// Run a command on the instance
    Connect(commands::connect::ConnectArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            quiet,
            no_color,
            config,
            command,
            ..
        } = self;
        let app = AppContext::new(&AppFlags {
            no_color,
            quiet,
            config,
        })?;
        match command {
            Command::Up(args) => commands::up::run(&app, args).await,
            Command::Down(args) => commands::down::run(&app, args).await,
            Command::Connect(args) => commands::connect::run(&app, args).await,
        }
    }

    /// Default log filter for the verbosity level.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "ec2_k3s=debug,warn",
            _ => "ec2_k3s=trace,russh=debug,info",
        }
    }
}
