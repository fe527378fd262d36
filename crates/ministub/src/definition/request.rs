//! Reusable outbound request templates.

use super::service::Protocol;
use crate::assertion::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Methods a request template may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A reusable call template, referenced by name from `request` actions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTemplate {
    /// Path (and optional query) appended to the service base URL
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub expected_response: ExpectedResponse,
    /// Require the target to echo every request header back unchanged
    #[serde(default = "default_echo_headers")]
    pub echo_headers: bool,
}

fn default_echo_headers() -> bool {
    true
}

impl RequestTemplate {
    /// Request headers the response must carry back, if echoing is enabled
    pub fn echoed_headers(&self) -> Option<&BTreeMap<String, String>> {
        self.echo_headers.then_some(&self.headers)
    }
}

/// Contract the response to a chained request must satisfy.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResponse {
    /// Exact status code expected (0 = not declared)
    #[serde(default)]
    pub status_code: u16,
    /// Headers that must be present with exactly these values
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Dotted body path -> declared type
    #[serde(default)]
    pub body: BTreeMap<String, ValueType>,
}
