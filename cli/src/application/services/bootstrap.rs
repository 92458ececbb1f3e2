//! k3s bootstrap steps run over an open remote shell.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};

use crate::application::ports::RemoteShell;
use crate::domain::kubeconfig::{REMOTE_KUBECONFIG_PATH, rewrite_server_host};

/// Lists cluster nodes; used as the node readiness probe.
pub const NODE_STATUS_COMMAND: &str = "sudo k3s kubectl get nodes --no-headers";

/// Shell command installing k3s with the public address in the API
/// server certificate.
#[must_use]
pub fn install_command(public_ip: &str) -> String {
    format!(
        "curl -sfL https://get.k3s.io | INSTALL_K3S_EXEC='--tls-san={public_ip}' sh -s - --disable traefik"
    )
}

/// Run the k3s installer, streaming its output to the terminal.
///
/// # Errors
///
/// Returns an error if the installer cannot be started or exits non-zero.
pub async fn install_k3s(shell: &impl RemoteShell, public_ip: &str) -> Result<()> {
    shell
        .execute(&install_command(public_ip), true)
        .await
        .context("installing k3s")?;
    Ok(())
}

/// Whether `kubectl get nodes` output shows at least one `Ready` node.
#[must_use]
pub fn nodes_ready(output: &str) -> bool {
    output
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some("Ready"))
}

/// One node-readiness probe. "Not ready" covers the API server not
/// answering yet; transport failures are real errors.
///
/// # Errors
///
/// Returns an error if the command could not run on the remote host.
pub async fn probe_node_ready(shell: &impl RemoteShell) -> Result<bool> {
    match shell.execute(NODE_STATUS_COMMAND, false).await {
        Ok(result) => Ok(nodes_ready(&result.stdout_lossy())),
        Err(e) if e.exit_status().is_some() => {
            tracing::debug!(error = %e, "node status not available yet");
            Ok(false)
        }
        Err(e) => Err(e).context("checking node status"),
    }
}

/// Print the remote kubeconfig and point it at `public_ip`.
///
/// # Errors
///
/// Returns an error if the file cannot be read on the remote host or the
/// address is not usable.
pub async fn fetch_kubeconfig(shell: &impl RemoteShell, public_ip: &str) -> Result<String> {
    let result = shell
        .execute(&format!("sudo cat {REMOTE_KUBECONFIG_PATH}"), false)
        .await
        .context("reading remote kubeconfig")?;
    let raw = String::from_utf8(result.stdout).context("remote kubeconfig is not UTF-8")?;
    anyhow::ensure!(!raw.trim().is_empty(), "remote kubeconfig is empty");
    rewrite_server_host(&raw, public_ip)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
