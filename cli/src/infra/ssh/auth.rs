//! Private key loading for SSH public-key authentication.

use std::path::Path;

use anyhow::Result;
use russh::keys::PrivateKey;

use crate::domain::ShellError;

/// Environment variable consulted before prompting for a key passphrase.
pub const PASSPHRASE_ENV: &str = "EC2_K3S_SSH_PASSPHRASE";

/// Loads and decodes the OpenSSH private key at `path`.
///
/// `passphrase` is only invoked when the key turns out to be encrypted; it
/// returns `None` when no passphrase is available.
///
/// # Errors
///
/// Returns [`ShellError::Key`] if the file cannot be read, is not a private
/// key, is encrypted with no passphrase available, or the passphrase is wrong.
pub async fn load_private_key(
    path: &Path,
    passphrase: impl FnOnce() -> Result<Option<String>>,
) -> Result<PrivateKey, ShellError> {
    let key_error = |reason: String| ShellError::Key {
        path: path.display().to_string(),
        reason,
    };

    let pem = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| key_error(format!("cannot read key file: {e}")))?;

    match russh::keys::decode_secret_key(&pem, None) {
        Ok(key) => Ok(key),
        Err(russh::keys::Error::KeyIsEncrypted) => {
            tracing::debug!(path = %path.display(), "private key is encrypted");
            let secret = passphrase()
                .map_err(|e| key_error(format!("cannot obtain passphrase: {e:#}")))?
                .ok_or_else(|| {
                    key_error(format!(
                        "key is encrypted and no passphrase is available (set {PASSPHRASE_ENV})"
                    ))
                })?;
            russh::keys::decode_secret_key(&pem, Some(&secret))
                .map_err(|e| key_error(format!("cannot decrypt key: {e}")))
        }
        Err(e) => Err(key_error(format!("not a usable private key: {e}"))),
    }
}

/// Passphrase from [`PASSPHRASE_ENV`], else an interactive prompt when stderr
/// is a terminal, else `None`.
///
/// # Errors
///
/// Returns an error if the interactive prompt fails.
pub fn passphrase_from_env_or_prompt(path: &Path) -> Result<Option<String>> {
    if let Ok(secret) = std::env::var(PASSPHRASE_ENV) {
        return Ok(Some(secret));
    }
    if !console::Term::stderr().is_term() {
        return Ok(None);
    }
    let secret = dialoguer::Password::new()
        .with_prompt(format!("Passphrase for {}", path.display()))
        .allow_empty_password(true)
        .interact()?;
    Ok(Some(secret))
}
