//! Endpoint declarations: path patterns, per-method validation rules and replies.

use super::action::Action;
use crate::assertion::ValueType;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Declared type and presence rule for a path or query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub required: bool,
}

/// Parameter expectations for an endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub query: BTreeMap<String, ParamSpec>,
    /// Keyed by the name after `:` in the path pattern
    #[serde(default, alias = "url")]
    pub path: BTreeMap<String, ParamSpec>,
}

/// Expectations on the incoming request headers and body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Receives {
    /// Exact-match headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Dotted body path -> declared type
    #[serde(default)]
    pub body: BTreeMap<String, ValueType>,
}

/// One weighted response variant of an endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StubResponse {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    /// Percentage points out of 100
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// What an endpoint replies with.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Bare status code, no headers or body
    Fixed(u16),
    /// Status code -> response variant, chosen by weight
    Weighted(BTreeMap<u16, StubResponse>),
}

impl Reply {
    /// Every status code this reply can produce
    pub fn status_codes(&self) -> Vec<u16> {
        match self {
            Reply::Fixed(status) => vec![*status],
            Reply::Weighted(responses) => responses.keys().copied().collect(),
        }
    }
}

/// A declared (path pattern, method) combination.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawEndpoint")]
pub struct Endpoint {
    pub params: Params,
    pub receives: Option<Receives>,
    pub reply: Reply,
    pub actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    #[serde(default)]
    params: Params,
    #[serde(default, alias = "recieves")]
    receives: Option<Receives>,
    #[serde(default)]
    response: u16,
    #[serde(default)]
    responses: Option<BTreeMap<u16, StubResponse>>,
    #[serde(default)]
    actions: Vec<Action>,
}

impl TryFrom<RawEndpoint> for Endpoint {
    type Error = String;

    fn try_from(raw: RawEndpoint) -> Result<Self, Self::Error> {
        let reply = match (raw.response, raw.responses) {
            (0, Some(responses)) if !responses.is_empty() => Reply::Weighted(responses),
            (0, _) => return Err("endpoint must set 'response' or 'responses'".to_string()),
            (status, None) => Reply::Fixed(status),
            (_, Some(_)) => {
                return Err("endpoint must set only one of 'response' or 'responses'".to_string())
            }
        };

        Ok(Endpoint {
            params: raw.params,
            receives: raw.receives,
            reply,
            actions: raw.actions,
        })
    }
}

/// One `/`-separated piece of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(String),
    /// `:name` segment bound to `params.path[name]`
    Param(String),
}

/// A declared path pattern with its endpoints keyed by lower-cased method.
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: String,
    pub segments: Vec<PathSegment>,
    pub methods: BTreeMap<String, Endpoint>,
}

impl Route {
    pub fn new(pattern: impl Into<String>, methods: BTreeMap<String, Endpoint>) -> Self {
        let pattern = pattern.into();
        let segments = pattern
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => PathSegment::Param(name.to_string()),
                None => PathSegment::Literal(segment.to_string()),
            })
            .collect();
        let methods = methods
            .into_iter()
            .map(|(method, endpoint)| (method.to_ascii_lowercase(), endpoint))
            .collect();

        Self {
            pattern,
            segments,
            methods,
        }
    }

    /// Endpoint for a method, matched case-insensitively
    pub fn endpoint(&self, method: &str) -> Option<&Endpoint> {
        self.methods.get(&method.to_ascii_lowercase())
    }

    /// Names of the `:param` segments in this pattern
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            PathSegment::Param(name) => Some(name.as_str()),
            PathSegment::Literal(_) => None,
        })
    }
}

/// Declared routes in definition order, with an exact-pattern index.
#[derive(Debug, Clone, Default)]
pub struct EndpointTable {
    routes: Vec<Route>,
    index: HashMap<String, usize>,
}

impl EndpointTable {
    /// Append a route; callers reject repeated patterns first.
    fn push(&mut self, route: Route) {
        self.index.insert(route.pattern.clone(), self.routes.len());
        self.routes.push(route);
    }

    /// Route declared with exactly this pattern
    pub fn get(&self, pattern: &str) -> Option<&Route> {
        self.index.get(pattern).map(|&i| &self.routes[i])
    }

    /// Routes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<'de> Deserialize<'de> for EndpointTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(EndpointTableVisitor)
    }
}

struct EndpointTableVisitor;

impl<'de> Visitor<'de> for EndpointTableVisitor {
    type Value = EndpointTable;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of path patterns to method tables")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut table = EndpointTable::default();
        while let Some((pattern, methods)) =
            map.next_entry::<String, BTreeMap<String, Endpoint>>()?
        {
            if table.get(&pattern).is_some() {
                return Err(de::Error::custom(format!(
                    "endpoint path '{pattern}' declared twice"
                )));
            }
            table.push(Route::new(pattern, methods));
        }
        Ok(table)
    }
}
