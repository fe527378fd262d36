//! Inbound request checks: query parameters, exact headers and typed body fields.
//!
//! Path parameters are checked while routing and are not repeated here.

use super::types::parse_query_string;
use crate::assertion::{assert_path_type, raw_matches};
use crate::definition::{Endpoint, Params, Receives};
use crate::error::DispatchError;
use hyper::HeaderMap;

/// Run every check the endpoint declares, stopping at the first failure.
pub fn validate_request(
    endpoint: &Endpoint,
    query: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), DispatchError> {
    if !endpoint.params.query.is_empty() {
        validate_query(&endpoint.params, query)?;
    }
    if let Some(receives) = &endpoint.receives {
        validate_headers(receives, headers)?;
        if !receives.body.is_empty() {
            validate_body(receives, body)?;
        }
    }
    Ok(())
}

/// An empty value counts as absent.
fn validate_query(params: &Params, query: Option<&str>) -> Result<(), DispatchError> {
    let values = parse_query_string(query);
    for (name, spec) in &params.query {
        match values.get(name).filter(|value| !value.is_empty()) {
            None if spec.required => {
                return Err(DispatchError::BadRequest(format!(
                    "Missing Query Parameter: {name}"
                )))
            }
            None => {}
            Some(value) if !raw_matches(spec.value_type, value) => {
                return Err(DispatchError::BadRequest(format!(
                    "Query Param Not Valid {} Value",
                    spec.value_type
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn validate_headers(receives: &Receives, headers: &HeaderMap) -> Result<(), DispatchError> {
    for (name, expected) in &receives.headers {
        let actual = headers.get(name.as_str()).and_then(|v| v.to_str().ok());
        if actual != Some(expected.as_str()) {
            return Err(DispatchError::BadRequest(format!(
                "Header Value {name} Not Found"
            )));
        }
    }
    Ok(())
}

fn validate_body(receives: &Receives, body: &[u8]) -> Result<(), DispatchError> {
    let document: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| DispatchError::BadRequest("Error Decoding Incoming Body".to_string()))?;
    for (path, value_type) in &receives.body {
        assert_path_type(&document, path, *value_type)
            .map_err(|e| DispatchError::BadRequest(e.to_string()))?;
    }
    Ok(())
}
