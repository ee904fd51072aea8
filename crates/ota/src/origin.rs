//! Public origin the server is reachable at from devices.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::OtaError;

/// Scheme, host and optional port of the public base URL, without a
/// trailing slash (`https://ota.example.com`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicOrigin(String);

impl PublicOrigin {
    /// Validates an explicitly configured base URL.
    pub fn parse(url: &str) -> Result<Self, OtaError> {
        let trimmed = url.trim().trim_end_matches('/');
        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .ok_or_else(|| OtaError::InvalidOrigin(format!("{url}: scheme must be http or https")))?;

        if rest.is_empty() || rest.starts_with(':') {
            return Err(OtaError::InvalidOrigin(format!("{url}: missing host")));
        }
        if rest.contains(['?', '#', ' ']) {
            return Err(OtaError::InvalidOrigin(format!(
                "{url}: query, fragment and spaces are not allowed"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Uses `public_url` when set, otherwise `<scheme>://<lan-ip>:<port>`
    /// where the scheme is `https` when the listener serves TLS.
    pub fn resolve(public_url: Option<&str>, tls: bool, port: u16) -> Result<Self, OtaError> {
        if let Some(url) = public_url.filter(|u| !u.trim().is_empty()) {
            return Self::parse(url);
        }
        let ip = get_local_ips()
            .into_iter()
            .next()
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        tracing::info!(%ip, port, tls, "no public_url configured, using local address");
        Ok(Self::from_ip(ip, tls, port))
    }

    pub(crate) fn from_ip(ip: IpAddr, tls: bool, port: u16) -> Self {
        let scheme = if tls { "https" } else { "http" };
        match ip {
            IpAddr::V4(v4) => Self(format!("{scheme}://{v4}:{port}")),
            IpAddr::V6(v6) => Self(format!("{scheme}://[{v6}]:{port}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins an absolute path (`/bundle/x`) onto the origin.
    pub fn join(&self, path: &str) -> String {
        format!("{}{path}", self.0)
    }

    pub fn is_https(&self) -> bool {
        self.0.starts_with("https://")
    }
}

impl fmt::Display for PublicOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns all non-loopback, non-link-local IPv4 addresses of this host.
pub fn get_local_ips() -> Vec<IpAddr> {
    let mut ips = Vec::new();

    let Ok(interfaces) = if_addrs::get_if_addrs() else {
        return ips;
    };

    for iface in interfaces {
        if iface.is_loopback() {
            continue;
        }
        if let IpAddr::V4(ipv4) = iface.ip() {
            if ipv4.is_loopback() || ipv4.is_link_local() {
                continue;
            }
            ips.push(IpAddr::V4(ipv4));
        }
    }

    ips
}
