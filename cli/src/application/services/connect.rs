//! Run one command on the cluster instance.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};

use crate::application::ports::{CloudInventory, RemoteShell, ShellConnector};
use crate::application::services::locator::resolve_address;
use crate::domain::{CommandResult, OwnerTag};

/// Resolve the owner's instance, run `command` there with live output, and
/// close the connection.
///
/// # Errors
///
/// Returns an error if the instance cannot be located or reached, or if the
/// command fails. A non-zero remote exit keeps its
/// [`ShellError::ExitStatus`](crate::domain::ShellError::ExitStatus) in the
/// error chain so callers can forward the status.
pub async fn run_remote(
    inventory: &impl CloudInventory,
    connector: &impl ShellConnector,
    region: &str,
    owner: &OwnerTag,
    command: &str,
) -> Result<CommandResult> {
    anyhow::ensure!(!command.trim().is_empty(), "command must not be empty");
    let address = resolve_address(inventory, region, owner).await?;
    let mut shell = connector.connect(&address).await?;
    let result = shell.execute(command, true).await;
    shell.close().await;
    result.with_context(|| format!("running command on {}", address.instance_id))
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{
        ScriptedConnector, ShellScript, remote_ok,
    };
    use crate::domain::{InstanceRecord, ShellError};

    struct OneInstance;

    impl CloudInventory for OneInstance {
        async fn describe_instances(&self, _: &str, _: &OwnerTag) -> Result<Vec<InstanceRecord>> {
            Ok(vec![InstanceRecord {
                instance_id: "i-0abc".to_string(),
                state: "running".to_string(),
                public_ip: Some("3.4.5.6".to_string()),
                public_dns: None,
            }])
        }
        async fn reachability(&self, _: &str, _: &str) -> Result<Option<String>> {
            anyhow::bail!("not expected")
        }
    }

    fn owner() -> OwnerTag {
        OwnerTag::parse("alice-0123456789abcdef").expect("valid owner")
    }

    #[tokio::test]
    async fn test_run_remote_streams_and_closes() {
        let script = ShellScript::new(vec![remote_ok("hello\n")]);
        let connector = ScriptedConnector::new(&script);
        let result = run_remote(&OneInstance, &connector, "us-east-1", &owner(), "echo hello")
            .await
            .expect("run");
        assert_eq!(result.stdout_lossy(), "hello\n");
        assert_eq!(
            *script.commands.borrow(),
            vec![("echo hello".to_string(), true)]
        );
        assert_eq!(script.closes.get(), 1);
    }

    #[tokio::test]
    async fn test_run_remote_nonzero_exit_keeps_status_and_closes() {
        let script = ShellScript::new(vec![Err(ShellError::ExitStatus {
            status: 3,
            stdout: Vec::new(),
            stderr: String::new(),
        })]);
        let connector = ScriptedConnector::new(&script);
        let err = run_remote(&OneInstance, &connector, "us-east-1", &owner(), "exit 3")
            .await
            .expect_err("expected failure");
        let status = err
            .chain()
            .find_map(|e| e.downcast_ref::<ShellError>())
            .and_then(ShellError::exit_status);
        assert_eq!(status, Some(3));
        assert_eq!(script.closes.get(), 1);
    }

    #[tokio::test]
    async fn test_run_remote_rejects_blank_command() {
        let script = ShellScript::new(vec![]);
        let connector = ScriptedConnector::new(&script);
        assert!(
            run_remote(&OneInstance, &connector, "us-east-1", &owner(), "  ")
                .await
                .is_err()
        );
        assert!(connector.connected_to.borrow().is_empty());
    }
}
