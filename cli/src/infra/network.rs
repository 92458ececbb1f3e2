//! Network infrastructure: discovers the workstation's public address.

use std::net::Ipv4Addr;

use anyhow::{Context, Result};

const CHECKIP_URL: &str = "https://checkip.amazonaws.com";

/// Public IPv4 address of this machine as seen from AWS.
///
/// `EC2_K3S_WORKSTATION_IP` short-circuits the lookup; `EC2_K3S_CHECKIP_URL`
/// replaces the lookup endpoint.
///
/// # Errors
///
/// Returns an error if the endpoint cannot be reached or does not answer
/// with an IPv4 address.
pub async fn workstation_ip() -> Result<Ipv4Addr> {
    if let Ok(fixed) = std::env::var("EC2_K3S_WORKSTATION_IP") {
        return parse_ip(&fixed);
    }
    let url = std::env::var("EC2_K3S_CHECKIP_URL").unwrap_or_else(|_| CHECKIP_URL.to_string());
    let body = tokio::task::spawn_blocking(move || fetch(&url))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking panicked: {e}"))??;
    let ip = parse_ip(&body)?;
    tracing::debug!(%ip, "workstation public address");
    Ok(ip)
}

fn fetch(url: &str) -> Result<String> {
    match ureq::get(url).set("User-Agent", "ec2-k3s").call() {
        Ok(resp) => resp.into_string().context("reading response"),
        Err(ureq::Error::Status(code, _)) => {
            anyhow::bail!("cannot determine workstation address: HTTP {code} from {url}")
        }
        Err(e) => anyhow::bail!("cannot determine workstation address: {e}"),
    }
}

fn parse_ip(raw: &str) -> Result<Ipv4Addr> {
    raw.trim()
        .parse()
        .with_context(|| format!("not an IPv4 address: {:?}", raw.trim()))
}

/// CIDR block admitting exactly `ip`.
#[must_use]
pub fn host_cidr(ip: Ipv4Addr) -> String {
    format!("{ip}/32")
}
