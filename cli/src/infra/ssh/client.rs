//! `russh`-backed implementation of the remote shell ports.

use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle, Msg};
use russh::keys::{HashAlg, PrivateKey, PrivateKeyWithHashAlg, ssh_key};
use russh::{Channel, ChannelMsg, Disconnect};
use tokio::io::{Stderr, Stdout};

use super::session::{self, CommandSession, Frame};
use crate::application::ports::{RemoteShell, ShellConnector};
use crate::domain::{CommandResult, InstanceAddress, ShellError};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Accepts any host key on first sight.
///
/// Instances are freshly launched and their host keys are unknown in
/// advance; the fingerprint is logged for audit.
struct TrustOnFirstUse {
    addr: String,
}

impl client::Handler for TrustOnFirstUse {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!(
            addr = %self.addr,
            fingerprint = %server_public_key.fingerprint(HashAlg::Sha256),
            "accepting host key"
        );
        Ok(true)
    }
}

/// Opens authenticated SSH connections with a single private key.
pub struct SshConnector {
    user: String,
    port: u16,
    key: Arc<PrivateKey>,
    connect_timeout: Duration,
}

impl SshConnector {
    #[must_use]
    pub fn new(user: impl Into<String>, port: u16, key: PrivateKey, connect_timeout: Duration) -> Self {
        Self {
            user: user.into(),
            port,
            key: Arc::new(key),
            connect_timeout,
        }
    }

    async fn handshake(&self, addr: &str, host: &str) -> Result<Handle<TrustOnFirstUse>, ShellError> {
        let network = |reason: String| ShellError::Network {
            addr: addr.to_string(),
            reason,
        };
        let config = Arc::new(client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(KEEPALIVE_INTERVAL),
            ..Default::default()
        });
        let handler = TrustOnFirstUse {
            addr: addr.to_string(),
        };

        let connecting = client::connect(config, (host, self.port), handler);
        match tokio::time::timeout(self.connect_timeout, connecting).await {
            Ok(Ok(handle)) => Ok(handle),
            Ok(Err(e)) => Err(network(e.to_string())),
            Err(_) => Err(network(format!(
                "no SSH handshake within {}s",
                self.connect_timeout.as_secs()
            ))),
        }
    }

    async fn authenticate(&self, handle: &mut Handle<TrustOnFirstUse>, addr: &str) -> Result<(), ShellError> {
        let auth = |reason: String| ShellError::Auth {
            user: self.user.clone(),
            addr: addr.to_string(),
            reason,
        };
        let hash = handle
            .best_supported_rsa_hash()
            .await
            .map_err(|e| auth(e.to_string()))?
            .flatten();
        let outcome = handle
            .authenticate_publickey(&self.user, PrivateKeyWithHashAlg::new(Arc::clone(&self.key), hash))
            .await
            .map_err(|e| auth(e.to_string()))?;
        if outcome.success() {
            Ok(())
        } else {
            Err(auth("public key rejected".to_string()))
        }
    }
}

impl ShellConnector for SshConnector {
    type Shell = SshClient;

    async fn connect(&self, address: &InstanceAddress) -> Result<SshClient, ShellError> {
        let addr = address.socket_target(self.port);
        tracing::debug!(%addr, user = %self.user, "connecting");
        let mut handle = self.handshake(&addr, &address.public_ip).await?;
        if let Err(e) = self.authenticate(&mut handle, &addr).await {
            let _ = handle.disconnect(Disconnect::ByApplication, "", "English").await;
            return Err(e);
        }
        tracing::debug!(%addr, "authenticated");
        Ok(SshClient {
            handle: Some(handle),
            addr,
        })
    }
}

/// An authenticated SSH connection. Each command runs in its own channel.
pub struct SshClient {
    handle: Option<Handle<TrustOnFirstUse>>,
    addr: String,
}

impl SshClient {
    fn execution(reason: impl std::fmt::Display) -> ShellError {
        ShellError::Execution {
            reason: reason.to_string(),
        }
    }
}

impl RemoteShell for SshClient {
    async fn execute(&self, command: &str, stream: bool) -> Result<CommandResult, ShellError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| Self::execution("connection already closed"))?;
        tracing::debug!(addr = %self.addr, command, "exec");

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Self::execution(format!("cannot open session: {e}")))?;
        let mut session = ChannelSession {
            channel,
            closed: false,
        };
        if let Err(e) = session.channel.exec(true, command).await {
            session.close().await;
            return Err(Self::execution(format!("cannot start command: {e}")));
        }

        let result = if stream {
            session::collect(&mut session, Some(tokio::io::stdout()), Some(tokio::io::stderr())).await?
        } else {
            session::collect(&mut session, None::<Stdout>, None::<Stderr>).await?
        };
        tracing::debug!(
            addr = %self.addr,
            exit_status = ?result.exit_status,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "exec finished"
        );
        result.into_checked()
    }

    async fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.disconnect(Disconnect::ByApplication, "", "English").await {
                tracing::debug!(addr = %self.addr, error = %e, "disconnect failed");
            }
        }
    }
}

/// Adapts a russh channel to the frame stream `collect` consumes.
struct ChannelSession {
    channel: Channel<Msg>,
    closed: bool,
}

impl CommandSession for ChannelSession {
    async fn next_frame(&mut self) -> Result<Option<Frame>, ShellError> {
        loop {
            let Some(msg) = self.channel.wait().await else {
                return Ok(None);
            };
            let frame = match msg {
                ChannelMsg::Data { data } => Frame::Stdout(data.to_vec()),
                ChannelMsg::ExtendedData { data, ext: 1 } => Frame::Stderr(data.to_vec()),
                ChannelMsg::ExitStatus { exit_status } => Frame::ExitStatus(exit_status),
                ChannelMsg::ExitSignal { signal_name, .. } => Frame::ExitSignal(format!("{signal_name:?}")),
                ChannelMsg::Failure => {
                    return Err(SshClient::execution("server refused to run the command"));
                }
                ChannelMsg::Close => return Ok(None),
                _ => continue,
            };
            return Ok(Some(frame));
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.channel.close().await;
        }
    }
}
