//! `ec2-k3s connect`: run one command on the cluster instance.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::{connect, lifecycle};
use crate::domain::ShellError;

/// Arguments for the connect command.
#[derive(Args)]
pub struct ConnectArgs {
    /// Command to run on the instance
    #[arg(long, short = 'c')]
    pub command: String,

    /// AWS region (default: where the cluster was created)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

/// Run `ec2-k3s connect --command <cmd>`.
///
/// Remote output is streamed to the local stdout and stderr as it arrives.
///
/// # Errors
///
/// Returns an error if the instance cannot be reached or the command fails.
/// A non-zero remote exit is not an error here: its stderr has already been
/// streamed, so the status just becomes the process exit code.
pub async fn run(app: &AppContext, args: ConnectArgs) -> Result<ExitCode> {
    let cluster = lifecycle::current_cluster(&app.state_mgr).await?;
    let region = app.cluster_region(args.region.as_deref(), &cluster)?;
    let connector = app.ssh_connector().await?;
    let aws = app.aws();

    match connect::run_remote(&aws, &connector, &region, &cluster.owner, &args.command).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => match remote_exit_status(&e) {
            Some(status) => {
                tracing::debug!(status, "remote command failed");
                Ok(exit_code(status))
            }
            None => Err(e),
        },
    }
}

fn remote_exit_status(err: &anyhow::Error) -> Option<u32> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ShellError>())
        .and_then(ShellError::exit_status)
}

/// Remote statuses above 255 cannot be passed through; they become 255.
fn exit_code(status: u32) -> ExitCode {
    ExitCode::from(u8::try_from(status).unwrap_or(u8::MAX))
}
