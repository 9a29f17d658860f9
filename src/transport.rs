//! HTTP transport used by the probes

use async_trait::async_trait;

/// User-Agent sent with every probe request
pub const USER_AGENT: &str = concat!("reach-probe/", env!("CARGO_PKG_VERSION"));

/// How much of the response the probe needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Load the whole resource, like a browser loading an image
    Passive,
    /// Status line is enough
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: String,
    pub mode: FetchMode,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Performs one network fetch and returns the HTTP status code
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &ProbeRequest) -> Result<u16, TransportError>;
}

/// reqwest-backed transport; the client is shared across probes
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        // Probes target the local network directly, never through a proxy
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &ProbeRequest) -> Result<u16, TransportError> {
        tracing::debug!("Requesting {} ({:?})", request.url, request.mode);
        let response = self.client.get(request.url.as_str()).send().await?;
        let status = response.status();
        if request.mode == FetchMode::Passive {
            // A load only counts once the body has arrived
            let body = response.bytes().await?;
            tracing::debug!("{} -> {} ({} bytes)", request.url, status, body.len());
        } else {
            tracing::debug!("{} -> {}", request.url, status);
        }
        Ok(status.as_u16())
    }
}
