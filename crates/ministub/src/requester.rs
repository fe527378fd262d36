//! Outbound requester for chained requests.
//!
//! Sends a [`RequestTemplate`] to a [`Service`] and checks the response against the
//! template's expected contract (status code, header values, typed body fields).

use crate::assertion::assert_path_type;
use crate::definition::{ExpectedResponse, RequestTemplate, Service};
use crate::error::RequesterError;
use crate::metrics;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Fixed timeout applied to every outbound call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Something able to make chained requests.
#[async_trait]
pub trait Requester: Send + Sync {
    /// Send `request` to `service`, returning an error on transport failure or
    /// when the response does not satisfy the expected contract.
    async fn send(&self, service: &Service, request: &RequestTemplate) -> Result<(), RequesterError>;
}

/// HTTP/1.1 requester backed by a shared reqwest client.
///
/// The client is internally pooled and safe to share, so concurrent action runners
/// dispatch in parallel without an extra lock.
#[derive(Debug, Clone)]
pub struct HttpRequester {
    client: reqwest::Client,
}

impl HttpRequester {
    pub fn new() -> Result<Self, RequesterError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    fn build_request(
        &self,
        service: &Service,
        request: &RequestTemplate,
    ) -> Result<reqwest::Request, RequesterError> {
        let url = format!("{}{}", service.base_url(request.protocol), request.url);
        let parsed = reqwest::Url::parse(&url).map_err(|e| RequesterError::Build {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = self.client.request(request.method.into(), parsed);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(ref body) = request.body {
            let payload = serde_json::to_vec(body).map_err(RequesterError::Body)?;
            let has_content_type = request
                .headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
            if !has_content_type {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            builder = builder.body(payload);
        }

        builder.build().map_err(|e| RequesterError::Build {
            url,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn send(&self, service: &Service, request: &RequestTemplate) -> Result<(), RequesterError> {
        let outbound = self.build_request(service, request)?;
        debug!("Sending {} {}", outbound.method(), outbound.url());

        let started = Instant::now();
        let result = async {
            let response = self.client.execute(outbound).await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            validate_response(
                &request.expected_response,
                request.echoed_headers(),
                status,
                &headers,
                &body,
            )
        }
        .await;

        let outcome = match &result {
            Ok(()) => "success",
            Err(e) if e.is_validation() => "invalid",
            Err(_) => "error",
        };
        metrics::record_outbound(outcome, started.elapsed().as_secs_f64() * 1000.0);

        result
    }
}

/// Check a received response against the expected contract.
///
/// A status code of 0 in `expected` means no status was declared. When `echoed`
/// is set, each of those headers must also come back unchanged.
pub fn validate_response(
    expected: &ExpectedResponse,
    echoed: Option<&BTreeMap<String, String>>,
    status: u16,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), RequesterError> {
    if expected.status_code != 0 && status != expected.status_code {
        return Err(RequesterError::StatusMismatch {
            expected: expected.status_code,
            actual: status,
        });
    }

    if !expected.body.is_empty() {
        if body.is_empty() {
            return Err(RequesterError::ResponseBody(
                "response body expected, none received".to_string(),
            ));
        }
        let document: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| RequesterError::ResponseBody(e.to_string()))?;
        for (path, value_type) in &expected.body {
            assert_path_type(&document, path, *value_type)?;
        }
    }

    let required = expected.headers.iter().chain(echoed.into_iter().flatten());
    for (name, value) in required {
        let actual = headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if actual != value {
            return Err(RequesterError::HeaderMismatch {
                name: name.clone(),
                expected: value.clone(),
                actual: actual.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{AssertionError, ValueType};
    use crate::definition::{HttpMethod, Protocol};
    use reqwest::header::HeaderValue;

    fn expected(status: u16) -> ExpectedResponse {
        ExpectedResponse {
            status_code: status,
            ..Default::default()
        }
    }

    fn template() -> RequestTemplate {
        RequestTemplate {
            url: "/v1/notify?source=stub".to_string(),
            method: HttpMethod::Post,
            protocol: Protocol::Http,
            headers: BTreeMap::from([("X-Trace".to_string(), "abc".to_string())]),
            body: Some(serde_json::json!({"event": "created"})),
            expected_response: expected(202),
            echo_headers: false,
        }
    }

    #[test]
    fn test_status_mismatch_is_validation_error() {
        let err = validate_response(&expected(200), None, 503, &HeaderMap::new(), b"").unwrap_err();
        assert!(matches!(
            err,
            RequesterError::StatusMismatch {
                expected: 200,
                actual: 503
            }
        ));
        assert!(err.is_validation());
    }

    #[test]
    fn test_undeclared_status_accepts_anything() {
        assert!(validate_response(&expected(0), None, 418, &HeaderMap::new(), b"").is_ok());
    }

    #[test]
    fn test_body_fields_checked() {
        let mut contract = expected(200);
        contract.body = BTreeMap::from([
            ("orders".to_string(), ValueType::Array),
            ("orders.0.id".to_string(), ValueType::Integer),
        ]);

        let good = br#"{"orders": [{"id": 7}]}"#;
        assert!(validate_response(&contract, None, 200, &HeaderMap::new(), good).is_ok());

        let bad = br#"{"orders": [{"id": "seven"}]}"#;
        let err = validate_response(&contract, None, 200, &HeaderMap::new(), bad).unwrap_err();
        assert!(matches!(
            err,
            RequesterError::BodyField(AssertionError::WrongType { .. })
        ));

        let err = validate_response(&contract, None, 200, &HeaderMap::new(), b"").unwrap_err();
        assert!(matches!(err, RequesterError::ResponseBody(_)));

        let err =
            validate_response(&contract, None, 200, &HeaderMap::new(), b"not json").unwrap_err();
        assert!(matches!(err, RequesterError::ResponseBody(_)));
    }

    #[test]
    fn test_expected_and_echoed_headers() {
        let mut contract = expected(200);
        contract.headers = BTreeMap::from([("X-Served-By".to_string(), "billing".to_string())]);

        let mut headers = HeaderMap::new();
        headers.insert("x-served-by", HeaderValue::from_static("billing"));
        assert!(validate_response(&contract, None, 200, &headers, b"").is_ok());

        let echoed = BTreeMap::from([("X-Trace".to_string(), "abc".to_string())]);
        let err = validate_response(&contract, Some(&echoed), 200, &headers, b"").unwrap_err();
        match err {
            RequesterError::HeaderMismatch { name, actual, .. } => {
                assert_eq!(name, "X-Trace");
                assert_eq!(actual, "");
            }
            other => panic!("unexpected error: {other}"),
        }

        headers.insert("x-trace", HeaderValue::from_static("abc"));
        assert!(validate_response(&contract, Some(&echoed), 200, &headers, b"").is_ok());
    }

    #[test]
    fn test_request_headers_echoed_by_default() {
        let yaml = r#"
url: /events
method: post
headers: {X-Trace: abc}
expectedResponse: {statusCode: 202}
"#;
        let request: RequestTemplate = serde_yaml::from_str(yaml).unwrap();
        let contract = &request.expected_response;

        let err = validate_response(
            contract,
            request.echoed_headers(),
            202,
            &HeaderMap::new(),
            b"",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RequesterError::HeaderMismatch { ref name, .. } if name == "X-Trace"
        ));

        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("abc"));
        assert!(validate_response(contract, request.echoed_headers(), 202, &headers, b"").is_ok());

        let opted_out: RequestTemplate =
            serde_yaml::from_str(&format!("{yaml}echoHeaders: false\n")).unwrap();
        assert!(opted_out.echoed_headers().is_none());
        assert!(validate_response(
            &opted_out.expected_response,
            opted_out.echoed_headers(),
            202,
            &HeaderMap::new(),
            b""
        )
        .is_ok());
    }

    #[test]
    fn test_build_request() {
        let requester = HttpRequester::new().unwrap();
        let service = Service {
            hostname: "localhost".to_string(),
            port: 9001,
        };
        let request = requester.build_request(&service, &template()).unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "http://localhost:9001/v1/notify?source=stub"
        );
        assert_eq!(request.headers()["x-trace"], "abc");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            request.body().and_then(|b| b.as_bytes()),
            Some(br#"{"event":"created"}"#.as_slice())
        );
    }

    #[test]
    fn test_build_request_invalid_host() {
        let requester = HttpRequester::new().unwrap();
        let service = Service {
            hostname: "bad host".to_string(),
            port: 80,
        };
        let err = requester.build_request(&service, &template()).unwrap_err();
        assert!(matches!(err, RequesterError::Build { .. }));
    }

    #[tokio::test]
    async fn test_send_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let requester = HttpRequester::new().unwrap();
        let service = Service {
            hostname: "127.0.0.1".to_string(),
            port,
        };
        let err = requester.send(&service, &template()).await.unwrap_err();
        assert!(matches!(err, RequesterError::Transport(_)));
        assert!(!err.is_validation());
    }
}
