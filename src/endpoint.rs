use std::fmt;

use url::Url;

use crate::{ConnectorError, Result};

/// Validated server endpoint: an absolute `http` or `https` URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Parses and validates endpoint text.
    pub fn parse(text: &str) -> Result<Self> {
        let url = Url::parse(text.trim()).map_err(|err| ConnectorError::InvalidEndpoint {
            endpoint: text.to_owned(),
            reason: err.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(ConnectorError::InvalidEndpoint {
                endpoint: text.to_owned(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    /// Returns `true` when `text` would parse as an [`Endpoint`].
    pub fn is_valid(text: &str) -> bool {
        Self::parse(text).is_ok()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the endpoint a client session should use.
///
/// A discovered server address wins and is formatted as
/// `http://<address>:<port>/`. When discovery came back empty the configured
/// master URL is used if it is a valid endpoint. Returns `None` when neither
/// is usable.
pub fn resolve_endpoint(discovered_address: &str, port: u16, master_url: &str) -> Option<String> {
    let address = discovered_address.trim();
    if !address.is_empty() {
        return Some(format!("http://{address}:{port}/"));
    }
    Endpoint::is_valid(master_url).then(|| master_url.trim().to_owned())
}
