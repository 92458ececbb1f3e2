//! `ec2-k3s down`: terminate the instance and remove everything created for it.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ProgressReporter;
use crate::application::services::lifecycle;
use crate::output::TerminalReporter;

/// Arguments for the down command.
#[derive(Args)]
pub struct DownArgs {
    /// AWS region (default: where the cluster was created)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

/// Run `ec2-k3s down`.
///
/// # Errors
///
/// Returns an error if there is no cluster or if tearing it down fails.
pub async fn run(app: &AppContext, args: DownArgs) -> Result<ExitCode> {
    let cluster = lifecycle::current_cluster(&app.state_mgr).await?;
    let region = app.cluster_region(args.region.as_deref(), &cluster)?;
    let reporter = TerminalReporter::new(&app.output);
    if region != cluster.region {
        tracing::warn!(%region, recorded = %cluster.region, "tearing down outside the recorded region");
        reporter.warn(&format!(
            "cluster was created in {}, tearing down in {region}",
            cluster.region
        ));
    }

    let aws = app.aws();
    lifecycle::down(&aws, &app.state_mgr, &reporter, &region, &cluster.owner).await?;
    Ok(ExitCode::SUCCESS)
}
