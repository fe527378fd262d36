//! ministub: a declarative HTTP stub server.
//!
//! A YAML definition declares endpoints, the requests they accept and the
//! responses they return. Endpoints and responses can trigger actions that run
//! after the reply is sent: delays and chained requests to other services.

pub mod actions;
pub mod assertion;
pub mod definition;
pub mod error;
pub mod metrics;
pub mod requester;
pub mod server;

pub use actions::ActionExecutor;
pub use definition::Definition;
pub use error::{DispatchError, RequesterError};
pub use requester::{HttpRequester, Requester};
pub use server::{start, StubServer};
