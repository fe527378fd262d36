//! Target services and the protocol used to reach them.

use serde::{Deserialize, Serialize};

/// A named downstream service that chained requests are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Service {
    pub hostname: String,
    pub port: u16,
}

/// Protocol for outbound requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    /// Get protocol name as used in a URL scheme
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl Service {
    /// Base URL of the service (`protocol://hostname:port`) without a trailing slash.
    pub fn base_url(&self, protocol: Protocol) -> String {
        format!("{}://{}:{}", protocol.as_str(), self.hostname, self.port)
    }
}
