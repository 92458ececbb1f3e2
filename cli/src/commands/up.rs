//! `ec2-k3s up`: launch the instance, install k3s, fetch the kubeconfig.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ClusterStateStore;
use crate::application::services::lifecycle::{self, UpRequest};
use crate::commands::{interrupted, local_user};
use crate::domain::kubeconfig::KUBECONFIG_FILE_NAME;
use crate::domain::validate_instance_type;
use crate::infra::fs::LocalFs;
use crate::output::TerminalReporter;

/// Arguments for the up command.
#[derive(Args)]
pub struct UpArgs {
    /// AWS region (default: config file)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// EC2 instance type (default: config file, then t2.micro)
    #[arg(long)]
    pub instance_type: Option<String>,
}

/// Run `ec2-k3s up`.
///
/// Re-running after a failure reuses the same owner tag, so an instance left
/// behind by the failed attempt is picked up rather than duplicated.
///
/// # Errors
///
/// Returns an error if any step of the bring-up fails. Nothing is rolled
/// back; `ec2-k3s down` removes what was created.
pub async fn run(app: &AppContext, args: UpArgs) -> Result<ExitCode> {
    let existing = app.state_mgr.load_async().await?;
    let region = app.region(args.region.as_deref(), existing.as_ref())?;
    let instance_type = args
        .instance_type
        .unwrap_or_else(|| app.config.instance_type.clone());
    validate_instance_type(&instance_type)?;

    // Key problems surface before anything is created in AWS.
    let connector = app.ssh_connector().await?;
    let public_key = app.public_key_path()?;
    anyhow::ensure!(
        public_key.exists(),
        "public key {} not found (expected next to the private key)",
        public_key.display()
    );

    let mut cluster = lifecycle::claim_cluster(&app.state_mgr, &region, &local_user()).await?;
    tracing::info!(owner = %cluster.owner, %region, %instance_type, "bringing cluster up");

    let kubeconfig_path = std::env::current_dir()
        .context("cannot determine current directory")?
        .join(KUBECONFIG_FILE_NAME);
    let aws = app.aws();
    let reporter = TerminalReporter::new(&app.output);
    let req = UpRequest {
        region: &region,
        instance_type: &instance_type,
        owner: &cluster.owner,
        ssh_public_key_path: &public_key,
        kubeconfig_path: &kubeconfig_path,
        reachability: app.config.reachability.into(),
        node_ready: app.config.node_ready.into(),
    };
    let outcome =
        lifecycle::up(&aws, &aws, &connector, &LocalFs, &reporter, &req, interrupted).await?;
    drop(reporter);

    cluster.instance_id = Some(outcome.instance_id.clone());
    app.state_mgr
        .save_async(&cluster)
        .await
        .context("saving cluster state")?;

    let ctx = &app.output;
    ctx.success("Cluster is up.");
    ctx.kv("instance ", &outcome.instance_id);
    ctx.kv("public ip", &outcome.public_ip);
    ctx.kv("owner    ", cluster.owner.as_str());
    ctx.kv("use      ", &format!("export KUBECONFIG={}", kubeconfig_path.display()));
    Ok(ExitCode::SUCCESS)
}
