//! AWS adapter: implements `InfraEngine` and `CloudInventory` by driving
//! the `aws` CLI through a `CommandRunner`.
//!
//! Every resource created here is named `ec2-k3s-<owner>` and tagged with
//! `Owner=<owner>` and `Project=ec2-k3s`, so `destroy` only ever touches what
//! this owner created.

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::application::ports::{CloudInventory, CommandRunner, InfraEngine, InfraOutputs, InfraSpec};
use crate::domain::instance::{OWNER_TAG_KEY, PROJECT_TAG};
use crate::domain::ssh::validate_public_key;
use crate::domain::{InstanceRecord, LocateError, OwnerTag};
use crate::infra::command_runner::WAITER_TIMEOUT;
use crate::infra::network::{host_cidr, workstation_ip};

const AWS: &str = "aws";

/// Canonical's AWS account, publisher of the official Ubuntu images.
const UBUNTU_OWNER: &str = "099720109477";
const UBUNTU_IMAGE_PATTERN: &str = "ubuntu/images/hvm-ssd/ubuntu-jammy-22.04-amd64-server-*";

// ── Errors ────────────────────────────────────────────────────────────────────

/// A failed `aws` invocation, carrying the CLI's stderr.
#[derive(Debug, Error)]
#[error("aws {command} failed: {stderr}")]
pub struct AwsCliError {
    pub command: String,
    pub stderr: String,
}

impl AwsCliError {
    /// Whether the CLI reported the given AWS error code, e.g.
    /// `InvalidKeyPair.Duplicate`.
    #[must_use]
    pub fn has_code(&self, code: &str) -> bool {
        self.stderr.contains(&format!("({code})"))
    }
}

fn has_code(err: &anyhow::Error, code: &str) -> bool {
    err.downcast_ref::<AwsCliError>()
        .is_some_and(|e| e.has_code(code))
}

// ── Response shapes ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Ec2Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunInstancesResponse {
    #[serde(default)]
    instances: Vec<Ec2Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Instance {
    instance_id: String,
    state: Ec2InstanceState,
    public_ip_address: Option<String>,
    public_dns_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2InstanceState {
    name: String,
}

impl From<Ec2Instance> for InstanceRecord {
    fn from(i: Ec2Instance) -> Self {
        Self {
            instance_id: i.instance_id,
            state: i.state.name,
            public_ip: i.public_ip_address.filter(|s| !s.is_empty()),
            public_dns: i.public_dns_name.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstanceStatusResponse {
    #[serde(default)]
    instance_statuses: Vec<InstanceStatusEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceStatusEntry {
    instance_status: Option<StatusSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusSummary {
    #[serde(default)]
    details: Vec<StatusDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusDetail {
    name: String,
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroupsResponse {
    #[serde(default)]
    security_groups: Vec<SecurityGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroup {
    group_id: String,
}

// ── Adapter ───────────────────────────────────────────────────────────────────

/// `aws` CLI adapter.
pub struct AwsCli<R: CommandRunner> {
    runner: R,
    workstation_ip: Option<Ipv4Addr>,
}

impl<R: CommandRunner> AwsCli<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            workstation_ip: None,
        }
    }

    /// Use a fixed workstation address instead of looking it up.
    #[must_use]
    pub fn with_workstation_ip(mut self, ip: Ipv4Addr) -> Self {
        self.workstation_ip = Some(ip);
        self
    }

    /// Run `aws <args> --region <region>` and return stdout.
    async fn call(&self, region: &str, args: &[&str], timeout: Option<Duration>) -> Result<String> {
        let mut full: Vec<&str> = args.to_vec();
        full.extend_from_slice(&["--region", region]);
        let output = match timeout {
            Some(t) => self.runner.run_with_timeout(AWS, &full, t).await,
            None => self.runner.run(AWS, &full).await,
        }?;
        let command = args.iter().take(2).copied().collect::<Vec<_>>().join(" ");
        if !output.status.success() {
            return Err(AwsCliError {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        String::from_utf8(output.stdout).with_context(|| format!("aws {command}: output is not UTF-8"))
    }

    async fn call_json<T: for<'de> Deserialize<'de>>(&self, region: &str, args: &[&str]) -> Result<T> {
        let mut full: Vec<&str> = args.to_vec();
        full.extend_from_slice(&["--output", "json"]);
        let body = self.call(region, &full, None).await?;
        serde_json::from_str(&body).with_context(|| format!("parsing output of aws {}", args.join(" ")))
    }

    async fn call_text(&self, region: &str, args: &[&str]) -> Result<String> {
        let mut full: Vec<&str> = args.to_vec();
        full.extend_from_slice(&["--output", "text"]);
        Ok(self.call(region, &full, None).await?.trim().to_string())
    }

    async fn describe_by_owner(&self, region: &str, owner: &OwnerTag) -> Result<Vec<InstanceRecord>> {
        let filter = format!("Name=tag:{OWNER_TAG_KEY},Values={owner}");
        let resp: DescribeInstancesResponse = self
            .call_json(region, &["ec2", "describe-instances", "--filters", &filter])
            .await?;
        Ok(resp
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(InstanceRecord::from)
            .collect())
    }

    // ── create steps ──────────────────────────────────────────────────────────

    async fn ensure_key_pair(&self, spec: &InfraSpec<'_>, name: &str) -> Result<()> {
        let material = tokio::fs::read_to_string(spec.ssh_public_key_path)
            .await
            .with_context(|| format!("reading public key {}", spec.ssh_public_key_path.display()))?;
        validate_public_key(&material)
            .with_context(|| format!("in {}", spec.ssh_public_key_path.display()))?;

        let key_file = format!("fileb://{}", spec.ssh_public_key_path.display());
        let tags = resource_tags("key-pair", spec.owner);
        let imported = self
            .call_json::<serde_json::Value>(
                spec.region,
                &[
                    "ec2",
                    "import-key-pair",
                    "--key-name",
                    name,
                    "--public-key-material",
                    &key_file,
                    "--tag-specifications",
                    &tags,
                ],
            )
            .await;
        match imported {
            Ok(_) => {
                tracing::info!(key_pair = name, "imported key pair");
                Ok(())
            }
            Err(e) if has_code(&e, "InvalidKeyPair.Duplicate") => {
                tracing::debug!(key_pair = name, "key pair already exists");
                Ok(())
            }
            Err(e) => Err(e.context("importing key pair")),
        }
    }

    async fn find_security_group(&self, region: &str, name: &str) -> Result<Option<String>> {
        let filter = format!("Name=group-name,Values={name}");
        let resp: DescribeSecurityGroupsResponse = self
            .call_json(region, &["ec2", "describe-security-groups", "--filters", &filter])
            .await?;
        Ok(resp.security_groups.into_iter().next().map(|g| g.group_id))
    }

    async fn ensure_security_group(&self, spec: &InfraSpec<'_>, name: &str) -> Result<String> {
        let group_id = match self.find_security_group(spec.region, name).await? {
            Some(id) => id,
            None => {
                let tags = resource_tags("security-group", spec.owner);
                let id = self
                    .call_text(
                        spec.region,
                        &[
                            "ec2",
                            "create-security-group",
                            "--group-name",
                            name,
                            "--description",
                            "ec2-k3s access from the workstation",
                            "--tag-specifications",
                            &tags,
                            "--query",
                            "GroupId",
                        ],
                    )
                    .await
                    .context("creating security group")?;
                tracing::info!(group_id = %id, "created security group");
                id
            }
        };

        let ip = match self.workstation_ip {
            Some(ip) => ip,
            None => workstation_ip().await?,
        };
        let cidr = host_cidr(ip);
        let authorized = self
            .call_json::<serde_json::Value>(
                spec.region,
                &[
                    "ec2",
                    "authorize-security-group-ingress",
                    "--group-id",
                    &group_id,
                    "--protocol",
                    "all",
                    "--cidr",
                    &cidr,
                ],
            )
            .await;
        match authorized {
            Ok(_) => tracing::info!(%cidr, "allowed workstation"),
            Err(e) if has_code(&e, "InvalidPermission.Duplicate") => {
                tracing::debug!(%cidr, "workstation already allowed");
            }
            Err(e) => return Err(e.context("authorizing workstation access")),
        }
        Ok(group_id)
    }

    async fn latest_ubuntu_image(&self, region: &str) -> Result<String> {
        let name_filter = format!("Name=name,Values={UBUNTU_IMAGE_PATTERN}");
        let image = self
            .call_text(
                region,
                &[
                    "ec2",
                    "describe-images",
                    "--owners",
                    UBUNTU_OWNER,
                    "--filters",
                    &name_filter,
                    "Name=state,Values=available",
                    "--query",
                    "sort_by(Images,&CreationDate)[-1].ImageId",
                ],
            )
            .await
            .context("looking up Ubuntu image")?;
        anyhow::ensure!(
            image.starts_with("ami-"),
            "no Ubuntu 22.04 image found in {region}"
        );
        Ok(image)
    }

    async fn launch(
        &self,
        spec: &InfraSpec<'_>,
        image: &str,
        key_name: &str,
        group_id: &str,
    ) -> Result<String> {
        let tags = format!(
            "ResourceType=instance,Tags=[{{Key=Name,Value={}}},{{Key={OWNER_TAG_KEY},Value={}}},{{Key=Project,Value={PROJECT_TAG}}}]",
            spec.owner.name_tag(),
            spec.owner
        );
        let resp: RunInstancesResponse = self
            .call_json(
                spec.region,
                &[
                    "ec2",
                    "run-instances",
                    "--image-id",
                    image,
                    "--instance-type",
                    spec.instance_type,
                    "--key-name",
                    key_name,
                    "--security-group-ids",
                    group_id,
                    "--count",
                    "1",
                    "--tag-specifications",
                    &tags,
                ],
            )
            .await
            .context("launching instance")?;
        let mut instances = resp.instances;
        anyhow::ensure!(
            instances.len() == 1,
            "run-instances returned {} instances, expected 1",
            instances.len()
        );
        let id = instances.remove(0).instance_id;
        tracing::info!(instance_id = %id, "launched instance");
        Ok(id)
    }
}

fn resource_name(owner: &OwnerTag) -> String {
    format!("{PROJECT_TAG}-{owner}")
}

fn resource_tags(resource_type: &str, owner: &OwnerTag) -> String {
    format!(
        "ResourceType={resource_type},Tags=[{{Key={OWNER_TAG_KEY},Value={owner}}},{{Key=Project,Value={PROJECT_TAG}}}]"
    )
}

impl<R: CommandRunner> InfraEngine for AwsCli<R> {
    async fn create(&self, spec: &InfraSpec<'_>) -> Result<InfraOutputs> {
        let name = resource_name(spec.owner);
        self.ensure_key_pair(spec, &name).await?;
        let group_id = self.ensure_security_group(spec, &name).await?;

        let live: Vec<InstanceRecord> = self
            .describe_by_owner(spec.region, spec.owner)
            .await?
            .into_iter()
            .filter(InstanceRecord::is_live)
            .collect();
        let (instance_id, reused) = match live.as_slice() {
            [] => {
                let image = self.latest_ubuntu_image(spec.region).await?;
                (self.launch(spec, &image, &name, &group_id).await?, false)
            }
            [existing] => {
                tracing::info!(instance_id = %existing.instance_id, "reusing instance");
                (existing.instance_id.clone(), true)
            }
            many => {
                return Err(LocateError::Ambiguous {
                    region: spec.region.to_string(),
                    owner: spec.owner.to_string(),
                    count: many.len(),
                }
                .into());
            }
        };

        self.call(
            spec.region,
            &["ec2", "wait", "instance-running", "--instance-ids", &instance_id],
            Some(WAITER_TIMEOUT),
        )
        .await
        .context("waiting for instance to start")?;

        let record = self
            .describe_by_owner(spec.region, spec.owner)
            .await?
            .into_iter()
            .find(|r| r.instance_id == instance_id)
            .with_context(|| format!("instance {instance_id} disappeared after launch"))?;
        Ok(InfraOutputs {
            instance_id,
            public_ip: record.public_ip,
            public_dns: record.public_dns,
            reused,
        })
    }

    async fn destroy(&self, region: &str, owner: &OwnerTag) -> Result<()> {
        let ids: Vec<String> = self
            .describe_by_owner(region, owner)
            .await?
            .into_iter()
            .filter(InstanceRecord::is_live)
            .map(|r| r.instance_id)
            .collect();
        if ids.is_empty() {
            tracing::info!(%owner, "no live instances to terminate");
        } else {
            let mut terminate = vec!["ec2", "terminate-instances", "--instance-ids"];
            terminate.extend(ids.iter().map(String::as_str));
            self.call_json::<serde_json::Value>(region, &terminate)
                .await
                .context("terminating instances")?;
            let mut wait = vec!["ec2", "wait", "instance-terminated", "--instance-ids"];
            wait.extend(ids.iter().map(String::as_str));
            self.call(region, &wait, Some(WAITER_TIMEOUT))
                .await
                .context("waiting for instances to terminate")?;
            tracing::info!(count = ids.len(), "terminated instances");
        }

        let name = resource_name(owner);
        if let Some(group_id) = self.find_security_group(region, &name).await? {
            self.call(region, &["ec2", "delete-security-group", "--group-id", &group_id], None)
                .await
                .context("deleting security group")?;
            tracing::info!(%group_id, "deleted security group");
        }
        self.call(region, &["ec2", "delete-key-pair", "--key-name", &name], None)
            .await
            .context("deleting key pair")?;
        Ok(())
    }
}

impl<R: CommandRunner> CloudInventory for AwsCli<R> {
    async fn describe_instances(&self, region: &str, owner: &OwnerTag) -> Result<Vec<InstanceRecord>> {
        self.describe_by_owner(region, owner).await
    }

    async fn reachability(&self, region: &str, instance_id: &str) -> Result<Option<String>> {
        let resp: DescribeInstanceStatusResponse = self
            .call_json(
                region,
                &[
                    "ec2",
                    "describe-instance-status",
                    "--instance-ids",
                    instance_id,
                    "--include-all-instances",
                ],
            )
            .await?;
        Ok(resp
            .instance_statuses
            .into_iter()
            .filter_map(|s| s.instance_status)
            .flat_map(|s| s.details)
            .find(|d| d.name == "reachability")
            .map(|d| d.status))
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
