//! Command implementations

use std::future::Future;

use crate::domain::Interrupted;

pub mod connect;
pub mod down;
pub mod up;

/// Local account name used to derive the owner tag.
pub(crate) fn local_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn interrupted() {
    until_signal(tokio::signal::ctrl_c()).await;
}

async fn until_signal(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Whether `err` comes from the user interrupting a wait.
#[must_use]
pub fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Interrupted>())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_signal_registration_failure_never_resolves() {
        let waited = tokio::time::timeout(
            Duration::from_secs(3600),
            until_signal(async { Err(std::io::Error::other("no signal driver")) }),
        )
        .await;
        assert!(waited.is_err(), "a failed registration must not cancel anything");
    }

    #[tokio::test]
    async fn test_delivered_signal_resolves() {
        until_signal(async { Ok(()) }).await;
    }

    #[test]
    fn test_is_interrupted_sees_through_context() {
        let err = anyhow::Error::new(Interrupted)
            .context("waiting for instance reachability")
            .context("failed while waiting for the instance to become reachable");
        assert!(is_interrupted(&err));
        assert!(!is_interrupted(&anyhow::anyhow!("interrupted")));
    }
}
