//! HTTP front end for a loaded definition.
//!
//! - `router`: method + path to endpoint, with eager path-parameter checks
//! - `validator`: query, header and body expectations
//! - `selector`: weighted response choice and rendering
//! - `stats`: per-route status counters behind `GET /stats`
//! - `stub`: the server itself, reserved routes and the accept loop

mod router;
mod selector;
mod stats;
mod stub;
mod types;
mod validator;

pub use router::{resolve, RouteMatch};
pub use selector::{select, Selection};
pub use stats::{StatsLedger, StatsSnapshot};
pub use stub::{serve_metrics, start, StubServer};
pub use validator::validate_request;
