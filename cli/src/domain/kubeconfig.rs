//! Kubeconfig rewriting for use from the workstation.
//!
//! Pure functions only. No I/O, no async, no filesystem access.

use std::net::Ipv4Addr;

use anyhow::Result;

/// Where k3s writes its admin kubeconfig on the node.
pub const REMOTE_KUBECONFIG_PATH: &str = "/etc/rancher/k3s/k3s.yaml";

/// Local file name, written to the current working directory.
pub const KUBECONFIG_FILE_NAME: &str = "kubeconfig";

/// Owner read/write only.
pub const KUBECONFIG_MODE: u32 = 0o600;

const LOOPBACK_HOSTS: [&str; 2] = ["127.0.0.1", "localhost"];

/// Replace every loopback host reference with the node's public address.
///
/// Matches are replaced left to right without overlap. Output that no longer
/// names a loopback host passes through a second rewrite unchanged.
///
/// # Errors
///
/// Returns an error if `public_ip` is not a routable IPv4 address.
pub fn rewrite_server_host(kubeconfig: &str, public_ip: &str) -> Result<String> {
    let ip: Ipv4Addr = public_ip
        .parse()
        .map_err(|_| anyhow::anyhow!("not an IPv4 address: {public_ip:?}"))?;
    anyhow::ensure!(
        !ip.is_loopback() && !ip.is_unspecified(),
        "refusing to point kubeconfig at {ip}"
    );
    let replacement = ip.to_string();

    let mut out = String::with_capacity(kubeconfig.len());
    let mut rest = kubeconfig;
    'outer: while let Some(ch) = rest.chars().next() {
        for host in LOOPBACK_HOSTS {
            if let Some(tail) = rest.strip_prefix(host) {
                out.push_str(&replacement);
                rest = tail;
                continue 'outer;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    Ok(out)
}
