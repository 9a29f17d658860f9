//! Probe targets: host, optional port, and how to probe them

use std::fmt;
use std::net::Ipv6Addr;

/// Default static asset fetched by the passive probe (admin UI favicon)
pub const DEFAULT_ASSET_PATH: &str = "/admin/img/favicon.png";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("target host is empty")]
    EmptyHost,
    #[error("target host {0:?} contains whitespace")]
    InvalidHost(String),
    #[error("target port must be non-zero")]
    ZeroPort,
}

/// Where the passive probe finds its static asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocator {
    /// Append a fixed path to the target address: `http://HOST[:PORT]{path}`
    PathOnHost(String),
    /// Fetch this exact URL; the target address is not used to build it
    Absolute(String),
}

impl Default for AssetLocator {
    fn default() -> Self {
        AssetLocator::PathOnHost(DEFAULT_ASSET_PATH.to_string())
    }
}

/// Probe technique for a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeKind {
    /// Passive fetch of a known static resource
    ImageLoad(AssetLocator),
    /// Request to `host:port`, classified by HTTP status
    HttpRequest,
}

/// Immutable probe target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: Option<u16>,
    kind: ProbeKind,
}

impl Target {
    pub fn new(
        host: impl Into<String>,
        port: Option<u16>,
        kind: ProbeKind,
    ) -> Result<Self, TargetError> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(TargetError::EmptyHost);
        }
        if host.chars().any(char::is_whitespace) {
            return Err(TargetError::InvalidHost(host));
        }
        if port == Some(0) {
            return Err(TargetError::ZeroPort);
        }
        Ok(Self { host, port, kind })
    }

    /// Passive-resource target using the default asset path
    pub fn image_load(host: impl Into<String>) -> Result<Self, TargetError> {
        Self::new(host, None, ProbeKind::ImageLoad(AssetLocator::default()))
    }

    /// Active-request target on `host:port`
    pub fn http_request(host: impl Into<String>, port: u16) -> Result<Self, TargetError> {
        Self::new(host, Some(port), ProbeKind::HttpRequest)
    }

    /// Same address, different probe technique
    pub fn with_kind(&self, kind: ProbeKind) -> Self {
        Self {
            host: self.host.clone(),
            port: self.port,
            kind,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn kind(&self) -> &ProbeKind {
        &self.kind
    }

    /// `host` or `host:port`, with IPv6 literals bracketed
    pub fn authority(&self) -> String {
        let host = if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match self.port {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        }
    }

    /// URL fetched by the passive probe
    pub fn asset_url(&self) -> String {
        let locator = match &self.kind {
            ProbeKind::ImageLoad(locator) => locator.clone(),
            ProbeKind::HttpRequest => AssetLocator::default(),
        };
        match locator {
            AssetLocator::PathOnHost(path) => {
                let sep = if path.starts_with('/') { "" } else { "/" };
                format!("http://{}{}{}", self.authority(), sep, path)
            }
            AssetLocator::Absolute(url) => url,
        }
    }

    /// URL requested by the active probe
    pub fn request_url(&self) -> String {
        format!("http://{}/", self.authority())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_blank_hosts() {
        assert_eq!(Target::image_load(""), Err(TargetError::EmptyHost));
        assert_eq!(Target::image_load("   "), Err(TargetError::EmptyHost));
        assert_eq!(
            Target::image_load("10.0 .0.5"),
            Err(TargetError::InvalidHost("10.0 .0.5".into()))
        );
    }

    #[test]
    fn rejects_port_zero() {
        assert_eq!(Target::http_request("10.0.0.7", 0), Err(TargetError::ZeroPort));
    }

    #[test]
    fn host_is_trimmed() {
        let target = Target::image_load(" pi.hole ").unwrap();
        assert_eq!(target.host(), "pi.hole");
    }

    #[test]
    fn asset_url_appends_default_path() {
        let target = Target::image_load("192.168.0.175").unwrap();
        assert_eq!(
            target.asset_url(),
            "http://192.168.0.175/admin/img/favicon.png"
        );
    }

    #[test]
    fn asset_url_respects_port_and_relative_path() {
        let target = Target::new(
            "10.0.0.5",
            Some(8080),
            ProbeKind::ImageLoad(AssetLocator::PathOnHost("favicon.ico".into())),
        )
        .unwrap();
        assert_eq!(target.asset_url(), "http://10.0.0.5:8080/favicon.ico");
    }

    #[test]
    fn absolute_locator_is_used_verbatim() {
        let url = "http://192.168.0.175/admin/img/favicon.png";
        let target = Target::new(
            "ignored.example",
            None,
            ProbeKind::ImageLoad(AssetLocator::Absolute(url.into())),
        )
        .unwrap();
        assert_eq!(target.asset_url(), url);
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let target = Target::http_request("fd00::53", 80).unwrap();
        assert_eq!(target.request_url(), "http://[fd00::53]:80/");
    }
}
