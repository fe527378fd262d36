//! Definition model for ministub.
//!
//! A definition is loaded once from YAML at startup, validated, and then shared
//! read-only by every request handler and action runner.
//!
//! ## Module Structure
//!
//! - `service`: target services and outbound protocol
//! - `request`: reusable outbound request templates and their expected responses
//! - `endpoint`: path patterns, parameter specs, replies, ordered endpoint table
//! - `action`: the closed `Action` type (delay / chained request)
//! - `validate`: load-time structural checks

mod action;
mod endpoint;
mod request;
mod service;
mod validate;

use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub use action::Action;
pub use endpoint::{
    Endpoint, EndpointTable, ParamSpec, Params, PathSegment, Receives, Reply, Route, StubResponse,
};
pub use request::{ExpectedResponse, HttpMethod, RequestTemplate};
pub use service::{Protocol, Service};

/// The only definition format version understood
pub const SUPPORTED_VERSION: f64 = 1.0;

/// Services, reusable requests, startup actions and endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    #[serde(default = "default_version")]
    pub version: f64,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
    #[serde(default)]
    pub requests: BTreeMap<String, RequestTemplate>,
    #[serde(default)]
    pub startup_actions: Vec<Action>,
    #[serde(default)]
    pub endpoints: EndpointTable,
}

fn default_version() -> f64 {
    SUPPORTED_VERSION
}

impl Definition {
    /// Read, parse and validate a definition file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read definition file {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid definition file {}", path.display()))
    }

    /// Parse and validate a definition from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let definition: Definition = serde_yaml::from_str(contents)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn request(&self, name: &str) -> Option<&RequestTemplate> {
        self.requests.get(name)
    }
}
