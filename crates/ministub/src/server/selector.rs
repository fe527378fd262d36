//! Weighted response selection and rendering.

use crate::definition::{Action, Reply, StubResponse};
use crate::error::DispatchError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use rand::Rng;

/// The reply chosen for one request.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub status: u16,
    /// `None` for a bare `response: <status>` endpoint
    pub response: Option<&'a StubResponse>,
}

impl<'a> Selection<'a> {
    /// Actions attached to the chosen response variant
    pub fn actions(&self) -> &'a [Action] {
        self.response.map(|r| r.actions.as_slice()).unwrap_or_default()
    }

    /// Build the HTTP response: declared headers, the status, then the JSON body if any.
    pub fn render(&self, route_key: &str) -> Result<Response<Full<Bytes>>, DispatchError> {
        let status = StatusCode::from_u16(self.status).map_err(|e| {
            DispatchError::Internal(format!(
                "Invalid Status Code For Endpoint {route_key}: {e}"
            ))
        })?;

        let mut builder = Response::builder().status(status);
        let mut body = Vec::new();

        if let Some(response) = self.response {
            if let Some(declared) = &response.body {
                body = serde_json::to_vec(declared).map_err(|e| {
                    DispatchError::Internal(format!(
                        "Unable To Write Response Body For Endpoint {route_key}: {e}"
                    ))
                })?;
            }

            for (name, value) in &response.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let declares_content_type = response
                .headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case("content-type"));
            if response.body.is_some() && !declares_content_type {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
        }

        builder.body(Full::new(Bytes::from(body))).map_err(|e| {
            DispatchError::Internal(format!(
                "Unable To Write Response Headers For Endpoint {route_key}: {e}"
            ))
        })
    }
}

/// Pick the reply for a request.
///
/// A weighted reply with several variants draws a point in `0..total_weight` and
/// walks the cumulative weights in ascending status-code order.
pub fn select<'a, R: Rng + ?Sized>(reply: &'a Reply, rng: &mut R) -> Selection<'a> {
    let responses = match reply {
        Reply::Fixed(status) => {
            return Selection {
                status: *status,
                response: None,
            }
        }
        Reply::Weighted(responses) => responses,
    };

    let total: u32 = responses.values().map(|r| r.weight).sum();
    let mut chosen = responses.iter().next();
    if responses.len() > 1 && total > 0 {
        let mut point = rng.gen_range(0..total);
        for entry in responses.iter() {
            if point < entry.1.weight {
                chosen = Some(entry);
                break;
            }
            point -= entry.1.weight;
        }
    }

    match chosen {
        Some((status, response)) => Selection {
            status: *status,
            response: Some(response),
        },
        None => Selection {
            status: 0,
            response: None,
        },
    }
}
