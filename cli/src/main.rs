//! ec2-k3s - single-node k3s clusters on EC2

use std::process::ExitCode;

use clap::Parser;
use ec2_k3s::cli::Cli;
use ec2_k3s::commands::{interrupted, is_interrupted};
use ec2_k3s::domain::Interrupted;
use tracing_subscriber::EnvFilter;

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    let result = tokio::select! {
        biased;
        result = cli.run() => result,
        () = interrupted() => Err(Interrupted.into()),
    };
    match result {
        Ok(code) => code,
        Err(e) if is_interrupted(&e) => {
            eprintln!("Interrupted");
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
