//! Side-effect actions attached to endpoints, responses, or startup.
//!
//! In a definition file an action is a single-key map:
//!
//! ```yaml
//! actions:
//!   - delay: 5
//!   - request:
//!       target: billing
//!       id: notify-billing
//! ```
//!
//! Entries are decoded once into [`Action`] when the definition is loaded.

use serde::Deserialize;

/// A single side-effect instruction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAction")]
pub enum Action {
    /// Suspend the action runner for this many seconds
    Delay { seconds: u64 },
    /// Send a named request template to a named service
    ChainedRequest { target: String, request: String },
}

impl Action {
    /// Short name used in logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Delay { .. } => "delay",
            Action::ChainedRequest { .. } => "request",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAction {
    #[serde(default)]
    delay: Option<u64>,
    #[serde(default)]
    request: Option<RawChainedRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChainedRequest {
    target: String,
    id: String,
}

impl TryFrom<RawAction> for Action {
    type Error = String;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        match (raw.delay, raw.request) {
            (Some(seconds), None) => Ok(Action::Delay { seconds }),
            (None, Some(chained)) => Ok(Action::ChainedRequest {
                target: chained.target,
                request: chained.id,
            }),
            (Some(_), Some(_)) => {
                Err("an action entry must declare exactly one of 'delay' or 'request'".to_string())
            }
            (None, None) => Err("action entry is empty; expected 'delay' or 'request'".to_string()),
        }
    }
}
