//! SSH transport: key loading, connection handling, and per-command sessions.

mod auth;
mod client;
mod session;

pub use auth::{PASSPHRASE_ENV, load_private_key, passphrase_from_env_or_prompt};
pub use client::{SshClient, SshConnector};
pub use session::{CommandSession, Frame, collect};
