//! Registry of monitored servers, supplied from the command line

use std::net::Ipv6Addr;
use std::str::FromStr;

use crate::target::{AssetLocator, ProbeKind, Target, TargetError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid target {0:?}: expected ID=HOST[:PORT] or ID=URL")]
    Syntax(String),
    #[error("invalid target id {0:?}: must be non-empty and must not contain '/'")]
    InvalidId(String),
    #[error("unknown target id {0:?}")]
    UnknownId(String),
    #[error("invalid port in {0:?}")]
    Port(String),
    #[error("duplicate target id {0:?}")]
    DuplicateId(String),
    #[error("target {id:?}: {source}")]
    Target {
        id: String,
        #[source]
        source: TargetError,
    },
}

/// One monitored server: its web UI and, optionally, a service port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    id: String,
    label: Option<String>,
    web: Target,
    service: Option<Target>,
}

impl RegistryEntry {
    pub fn new(
        id: impl Into<String>,
        host: &str,
        service_port: Option<u16>,
        locator: AssetLocator,
    ) -> Result<Self, RegistryError> {
        let id = id.into();
        // '/' separates the entry id from its service key
        if id.is_empty() || id.contains('/') {
            return Err(RegistryError::InvalidId(id));
        }
        let wrap = |source| RegistryError::Target {
            id: id.clone(),
            source,
        };
        let web = Target::new(host, None, ProbeKind::ImageLoad(locator)).map_err(wrap)?;
        let service = service_port
            .map(|port| Target::http_request(host, port))
            .transpose()
            .map_err(wrap)?;
        Ok(Self {
            id,
            label: None,
            web,
            service,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name, e.g. "Pi-hole DNS"
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn web(&self) -> &Target {
        &self.web
    }

    pub fn service(&self) -> Option<&Target> {
        self.service.as_ref()
    }

    /// Sink key for the web target
    pub fn web_id(&self) -> String {
        self.id.clone()
    }

    /// Sink key for the service target
    pub fn service_id(&self) -> String {
        format!("{}/service", self.id)
    }

    /// Replace the asset locator of the web target
    pub fn with_locator(mut self, locator: AssetLocator) -> Self {
        self.web = self.web.with_kind(ProbeKind::ImageLoad(locator));
        self
    }

    fn has_absolute_asset(&self) -> bool {
        matches!(
            self.web.kind(),
            ProbeKind::ImageLoad(AssetLocator::Absolute(_))
        )
    }
}

/// Parses `ID=HOST`, `ID=HOST:PORT`, `ID=[V6]:PORT` and `ID=URL`.
///
/// With `ID=URL` the web UI is checked by loading exactly that URL and no
/// service port is monitored.
impl FromStr for RegistryEntry {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || RegistryError::Syntax(s.to_string());
        let (id, addr) = s.split_once('=').ok_or_else(syntax)?;
        let (id, addr) = (id.trim(), addr.trim());
        if id.is_empty() || addr.is_empty() {
            return Err(syntax());
        }

        if addr.contains("://") {
            let url = reqwest::Url::parse(addr).map_err(|_| syntax())?;
            let host = url
                .host_str()
                .ok_or_else(syntax)?
                .trim_start_matches('[')
                .trim_end_matches(']');
            return RegistryEntry::new(id, host, None, AssetLocator::Absolute(addr.to_string()));
        }

        let (host, port) = split_host_port(addr).ok_or_else(syntax)?;
        let port = port
            .map(|p| match p.parse::<u16>() {
                Ok(0) | Err(_) => Err(RegistryError::Port(s.to_string())),
                Ok(p) => Ok(p),
            })
            .transpose()?;

        RegistryEntry::new(id, host, port, AssetLocator::default())
    }
}

fn split_host_port(addr: &str) -> Option<(&str, Option<&str>)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        return match tail {
            "" => Some((host, None)),
            _ => Some((host, Some(tail.strip_prefix(':')?))),
        };
    }
    // bare IPv6 literal without a port
    if addr.parse::<Ipv6Addr>().is_ok() {
        return Some((addr, None));
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => Some((host, Some(port))),
        None => Some((addr, None)),
    }
}

/// Ordered set of entries with unique ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRegistry {
    entries: Vec<RegistryEntry>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: RegistryEntry) -> Result<(), RegistryError> {
        if self.entries.iter().any(|e| e.id == entry.id) {
            return Err(RegistryError::DuplicateId(entry.id));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Build from `ID=HOST[:PORT]` / `ID=URL` specs. Host-based entries load
    /// `asset_path` from their own address; URL entries keep their URL.
    pub fn from_specs<S: AsRef<str>>(specs: &[S], asset_path: &str) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for spec in specs {
            let mut entry = spec.as_ref().parse::<RegistryEntry>()?;
            if !entry.has_absolute_asset() {
                entry = entry.with_locator(AssetLocator::PathOnHost(asset_path.to_string()));
            }
            registry.add(entry)?;
        }
        Ok(registry)
    }

    /// Attach a display label to an existing entry
    pub fn set_label(&mut self, id: &str, label: impl Into<String>) -> Result<(), RegistryError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| RegistryError::UnknownId(id.to_string()))?;
        entry.label = Some(label.into());
        Ok(())
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
