//! Resolves an incoming method and path to a declared endpoint.
//!
//! Literal patterns are looked up directly. Anything else falls back to a scan
//! of patterns with the same number of segments, in declaration order. The
//! first candidate whose literal segments all match is the only one evaluated:
//! its path parameters are type-checked on the spot and a mismatch fails the
//! request with 400 instead of trying later candidates.

use crate::assertion::raw_matches;
use crate::definition::{Endpoint, EndpointTable, PathSegment, Route};
use crate::error::DispatchError;

/// A resolved route and the endpoint for the request method
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub endpoint: &'a Endpoint,
}

impl RouteMatch<'_> {
    /// Declared pattern, used as the stats key
    pub fn key(&self) -> &str {
        &self.route.pattern
    }
}

/// Resolve `method` + `path` against the endpoint table.
pub fn resolve<'a>(
    endpoints: &'a EndpointTable,
    method: &str,
    path: &str,
) -> Result<RouteMatch<'a>, DispatchError> {
    if let Some(route) = endpoints.get(path) {
        return with_method(route, method);
    }

    let incoming: Vec<&str> = path.split('/').collect();
    let candidate = endpoints
        .iter()
        .find(|route| literals_match(route, &incoming));

    let Some(route) = candidate else {
        return Err(DispatchError::NotFound);
    };

    if let Some(endpoint) = route.endpoint(method) {
        check_path_params(route, endpoint, &incoming)?;
    }
    with_method(route, method)
}

fn with_method<'a>(route: &'a Route, method: &str) -> Result<RouteMatch<'a>, DispatchError> {
    route
        .endpoint(method)
        .map(|endpoint| RouteMatch { route, endpoint })
        .ok_or(DispatchError::MethodNotAllowed)
}

fn literals_match(route: &Route, incoming: &[&str]) -> bool {
    route.segments.len() == incoming.len()
        && route
            .segments
            .iter()
            .zip(incoming)
            .all(|(segment, value)| match segment {
                PathSegment::Literal(literal) => literal == value,
                PathSegment::Param(_) => true,
            })
}

/// Type-check each `:param` segment that has a declared spec.
fn check_path_params(
    route: &Route,
    endpoint: &Endpoint,
    incoming: &[&str],
) -> Result<(), DispatchError> {
    for (segment, value) in route.segments.iter().zip(incoming) {
        let PathSegment::Param(name) = segment else {
            continue;
        };
        if let Some(spec) = endpoint.params.path.get(name) {
            if !raw_matches(spec.value_type, value) {
                return Err(DispatchError::BadRequest(format!(
                    "Path Param Not Valid {} Value",
                    spec.value_type
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(yaml: &str) -> EndpointTable {
        serde_yaml::from_str(yaml).unwrap()
    }

    const ENDPOINTS: &str = r#"
/widgets:
  get: {response: 200}
  post: {response: 201}
/widgets/:id:
  get:
    response: 200
    params:
      path:
        id: {type: integer, required: true}
  delete: {response: 204}
/widgets/:name/parts:
  get: {response: 200}
/widgets/search:
  get: {response: 200}
/users/:id/orders/:order:
  get:
    response: 200
    params:
      path:
        order: {type: integer}
"#;

    #[test]
    fn test_exact_match() {
        let endpoints = table(ENDPOINTS);
        let found = resolve(&endpoints, "GET", "/widgets").unwrap();
        assert_eq!(found.key(), "/widgets");
        assert!(matches!(
            found.endpoint.reply,
            crate::definition::Reply::Fixed(200)
        ));

        let found = resolve(&endpoints, "post", "/widgets").unwrap();
        assert!(matches!(
            found.endpoint.reply,
            crate::definition::Reply::Fixed(201)
        ));
    }

    #[test]
    fn test_exact_match_wrong_method() {
        let endpoints = table(ENDPOINTS);
        let err = resolve(&endpoints, "PUT", "/widgets").unwrap_err();
        assert_eq!(err, DispatchError::MethodNotAllowed);
    }

    #[test]
    fn test_param_match_uses_pattern_as_key() {
        let endpoints = table(ENDPOINTS);
        let found = resolve(&endpoints, "GET", "/widgets/42").unwrap();
        assert_eq!(found.key(), "/widgets/:id");

        let found = resolve(&endpoints, "GET", "/widgets/abc/parts").unwrap();
        assert_eq!(found.key(), "/widgets/:name/parts");

        let found = resolve(&endpoints, "GET", "/users/alice/orders/7").unwrap();
        assert_eq!(found.key(), "/users/:id/orders/:order");
    }

    #[test]
    fn test_literal_route_wins_over_earlier_param_route() {
        let endpoints = table(ENDPOINTS);
        let found = resolve(&endpoints, "GET", "/widgets/search").unwrap();
        assert_eq!(found.key(), "/widgets/search");
    }

    #[test]
    fn test_param_type_mismatch_fails_eagerly() {
        let endpoints = table(
            r#"
/items/:id:
  get:
    response: 200
    params:
      path:
        id: {type: integer}
/items/:slug:
  get:
    response: 200
    params:
      path:
        slug: {type: string}
"#,
        );
        let err = resolve(&endpoints, "GET", "/items/abc").unwrap_err();
        assert_eq!(
            err,
            DispatchError::BadRequest("Path Param Not Valid integer Value".to_string())
        );
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_param_route_wrong_method() {
        let endpoints = table(ENDPOINTS);
        let err = resolve(&endpoints, "PATCH", "/widgets/abc").unwrap_err();
        assert_eq!(err, DispatchError::MethodNotAllowed);

        // delete declares no path spec, so any segment value is accepted
        assert!(resolve(&endpoints, "DELETE", "/widgets/abc").is_ok());
    }

    #[test]
    fn test_literal_mismatch_moves_to_next_candidate() {
        let endpoints = table(
            r#"
/a/:x/b:
  get: {response: 200}
/a/:x/c:
  get: {response: 201}
"#,
        );
        let found = resolve(&endpoints, "GET", "/a/1/c").unwrap();
        assert_eq!(found.key(), "/a/:x/c");
    }

    #[test]
    fn test_not_found() {
        let endpoints = table(ENDPOINTS);
        assert_eq!(
            resolve(&endpoints, "GET", "/unknown").unwrap_err(),
            DispatchError::NotFound
        );
        assert_eq!(
            resolve(&endpoints, "GET", "/widgets/1/2/3").unwrap_err(),
            DispatchError::NotFound
        );
        assert_eq!(
            resolve(&endpoints, "GET", "/widgets/1/other").unwrap_err(),
            DispatchError::NotFound
        );
    }
}
