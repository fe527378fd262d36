//! Load-time structural validation of a definition.
//!
//! The request-dispatch engine trusts everything checked here: weight sums,
//! resolvable action references, and a usable reply on every endpoint.

use super::{Action, Definition, Reply, SUPPORTED_VERSION};
use anyhow::bail;
use hyper::header::{HeaderName, HeaderValue};
use std::collections::BTreeMap;

impl Definition {
    /// Validate the definition
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.version != SUPPORTED_VERSION {
            bail!("Unsupported definition version: {}", self.version);
        }

        for (name, service) in &self.services {
            if service.hostname.is_empty() {
                bail!("Invalid service '{name}': hostname is empty");
            }
            if service.port == 0 {
                bail!("Invalid service '{name}': port must be between 1 and 65535");
            }
        }

        self.validate_actions(&self.startup_actions)
            .map_err(|e| anyhow::anyhow!("Invalid startup actions: {e}"))?;

        for (name, request) in &self.requests {
            if request.url.is_empty() {
                bail!("URL for request '{name}' is empty");
            }
            if !request.url.starts_with('/') {
                bail!("URL for request '{name}' must start with '/': {}", request.url);
            }
            validate_headers(&request.headers)
                .map_err(|e| anyhow::anyhow!("Headers for request '{name}': {e}"))?;
            validate_headers(&request.expected_response.headers).map_err(|e| {
                anyhow::anyhow!("Expected response headers for request '{name}': {e}")
            })?;
        }

        if self.endpoints.is_empty() {
            bail!("No endpoints defined");
        }

        for route in self.endpoints.iter() {
            if !route.pattern.starts_with('/') {
                bail!("Endpoint path must start with '/': {}", route.pattern);
            }
            if route.methods.is_empty() {
                bail!("No methods defined for endpoint {}", route.pattern);
            }

            for (method, endpoint) in &route.methods {
                for name in endpoint.params.path.keys() {
                    if !route.param_names().any(|param| param == name) {
                        bail!(
                            "Path param '{name}' for URL {}, method {method} does not appear in the path",
                            route.pattern
                        );
                    }
                }

                if let Some(receives) = &endpoint.receives {
                    validate_headers(&receives.headers).map_err(|e| {
                        anyhow::anyhow!(
                            "Received headers for URL {}, method {method}: {e}",
                            route.pattern
                        )
                    })?;
                }

                match &endpoint.reply {
                    Reply::Fixed(status) => validate_status(*status).map_err(|e| {
                        anyhow::anyhow!("Response for URL {}, method {method}: {e}", route.pattern)
                    })?,
                    Reply::Weighted(responses) => {
                        let mut total_weight = 0;
                        for (status, response) in responses {
                            validate_status(*status).map_err(|e| {
                                anyhow::anyhow!(
                                    "Response for URL {}, method {method}: {e}",
                                    route.pattern
                                )
                            })?;
                            validate_headers(&response.headers).map_err(|e| {
                                anyhow::anyhow!(
                                    "Response {status} headers for URL {}, method {method}: {e}",
                                    route.pattern
                                )
                            })?;
                            total_weight += response.weight;
                            self.validate_actions(&response.actions).map_err(|e| {
                                anyhow::anyhow!(
                                    "Error validating response {status} actions for URL {}, method {method}: {e}",
                                    route.pattern
                                )
                            })?;
                        }
                        if total_weight != 100 {
                            bail!(
                                "Response weighting for URL {}, method {method} sums to {total_weight}, expected 100",
                                route.pattern
                            );
                        }
                    }
                }

                self.validate_actions(&endpoint.actions).map_err(|e| {
                    anyhow::anyhow!(
                        "Error validating actions for URL {}, method {method}: {e}",
                        route.pattern
                    )
                })?;
            }
        }

        Ok(())
    }

    /// Ensure every chained request names a declared service and request
    fn validate_actions(&self, actions: &[Action]) -> Result<(), anyhow::Error> {
        for action in actions {
            if let Action::ChainedRequest { target, request } = action {
                if self.service(target).is_none() {
                    bail!("Service not defined for request action: {target}");
                }
                if self.request(request).is_none() {
                    bail!("Request not defined for request action: {request}");
                }
            }
        }
        Ok(())
    }
}

/// Header names and values must be sendable as-is on an HTTP/1.1 connection
fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), anyhow::Error> {
    for (name, value) in headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            bail!("invalid header name '{name}'");
        }
        if HeaderValue::from_str(value).is_err() {
            bail!("invalid value for header '{name}'");
        }
    }
    Ok(())
}

fn validate_status(status: u16) -> Result<(), anyhow::Error> {
    if !(100..=599).contains(&status) {
        bail!("status code {status} is out of range");
    }
    Ok(())
}
