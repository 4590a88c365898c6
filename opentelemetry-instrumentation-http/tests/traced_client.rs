use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use opentelemetry::global::BoxedTracer;
use opentelemetry::trace::{SpanKind, Status, TracerProvider as _};
use opentelemetry::Value;
use opentelemetry_http::{Bytes, HttpClient, HttpError, Request, Response};
use opentelemetry_instrumentation::{IntegrationConfig, Pin};
use opentelemetry_instrumentation_http::{TracedClient, SPAN_NAME};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

/// Test double standing in for a real HTTP client. Records every request it
/// receives and answers with a canned status or error.
#[derive(Clone, Debug)]
struct MockClient {
    status: u16,
    fail: bool,
    requests: Arc<Mutex<Vec<Request<Bytes>>>>,
}

impl MockClient {
    fn with_status(status: u16) -> Self {
        MockClient {
            status,
            fail: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing() -> Self {
        MockClient {
            fail: true,
            ..MockClient::with_status(0)
        }
    }

    fn recorded_requests(&self) -> Vec<Request<Bytes>> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        let mut copy = Request::builder()
            .method(request.method().clone())
            .uri(request.uri().clone())
            .body(request.body().clone())
            .expect("copy request");
        copy.headers_mut().clone_from(request.headers());
        self.requests.lock().unwrap().push(copy);

        if self.fail {
            return Err("connection refused".into());
        }
        Ok(Response::builder()
            .status(self.status)
            .body(Bytes::new())
            .expect("response"))
    }
}

fn test_pin() -> (InMemorySpanExporter, Pin) {
    opentelemetry_instrumentation_http::enable();
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let pin = Pin::new("test-service")
        .with_tracer(BoxedTracer::new(Box::new(provider.tracer("test"))));
    (exporter, pin)
}

fn get_request(uri: &str) -> Request<Bytes> {
    Request::builder()
        .method(http::Method::GET)
        .uri(uri)
        .body(Bytes::new())
        .expect("request")
}

fn attribute<'a>(span: &'a SpanData, key: &str) -> Option<&'a Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| &kv.value)
}

#[tokio::test]
async fn one_span_per_traced_call() {
    let (exporter, pin) = test_pin();
    let client = TracedClient::with_pin(MockClient::with_status(200), pin);

    let response = client
        .send_bytes(get_request("http://example.com/items?page=2"))
        .await
        .expect("response");
    assert_eq!(response.status(), 200);

    let spans = exporter.get_finished_spans().expect("spans");
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.name, SPAN_NAME);
    assert_eq!(span.span_kind, SpanKind::Client);
    assert!(matches!(span.status, Status::Unset));
    assert_eq!(
        attribute(span, "url.full").and_then(|v| match v {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }),
        Some("http://example.com/items"),
        "query string dropped by default"
    );
    assert_eq!(
        attribute(span, "http.request.method"),
        Some(&Value::from("GET"))
    );
    assert_eq!(
        attribute(span, "http.response.status_code"),
        Some(&Value::I64(200))
    );
    assert_eq!(
        attribute(span, "peer.service"),
        Some(&Value::from("test-service"))
    );
}

#[tokio::test]
async fn server_error_status_marks_span_as_error() {
    let (exporter, pin) = test_pin();
    let client = TracedClient::with_pin(MockClient::with_status(503), pin);

    let response = client
        .send_bytes(get_request("http://example.com/"))
        .await
        .expect("response");
    assert_eq!(response.status(), 503, "response passed through unchanged");

    let spans = exporter.get_finished_spans().expect("spans");
    assert_eq!(spans.len(), 1);
    assert!(matches!(spans[0].status, Status::Error { .. }));
}

#[tokio::test]
async fn client_error_status_is_not_span_error() {
    let (exporter, pin) = test_pin();
    let client = TracedClient::with_pin(MockClient::with_status(404), pin);

    client
        .send_bytes(get_request("http://example.com/missing"))
        .await
        .expect("response");

    let spans = exporter.get_finished_spans().expect("spans");
    assert_eq!(spans.len(), 1);
    assert!(matches!(spans[0].status, Status::Unset));
    assert_eq!(
        attribute(&spans[0], "http.response.status_code"),
        Some(&Value::I64(404))
    );
}

#[tokio::test]
async fn transport_error_is_recorded_and_propagated() {
    let (exporter, pin) = test_pin();
    let client = TracedClient::with_pin(MockClient::failing(), pin);

    let err = client
        .send_bytes(get_request("http://example.com/"))
        .await
        .expect_err("transport error");
    assert_eq!(err.to_string(), "connection refused");

    let spans = exporter.get_finished_spans().expect("spans");
    assert_eq!(spans.len(), 1);
    assert!(matches!(spans[0].status, Status::Error { .. }));
    assert_eq!(spans[0].events.len(), 1, "error event recorded");
}

#[tokio::test]
async fn propagation_headers_are_injected_when_configured() {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let (_exporter, pin) = test_pin();
    let inner = MockClient::with_status(200);
    let client = TracedClient::with_pin(inner.clone(), pin.clone());

    client
        .send_bytes(get_request("http://example.com/"))
        .await
        .expect("response");
    let plain = inner.recorded_requests();
    assert!(
        !plain[0].headers().contains_key("traceparent"),
        "injection is opt-in"
    );

    let client = TracedClient::with_pin(inner.clone(), pin)
        .with_config(IntegrationConfig::default().with_distributed_tracing(true));
    client
        .send_bytes(get_request("http://example.com/"))
        .await
        .expect("response");
    let propagated = inner.recorded_requests();
    assert!(propagated[0].headers().contains_key("traceparent"));
}

#[tokio::test]
async fn collector_endpoint_is_not_traced() {
    let (exporter, pin) = test_pin();
    let inner = MockClient::with_status(200);
    let client =
        TracedClient::with_pin(inner.clone(), pin).skip_authority("collector.example.com:4318");

    client
        .send_bytes(get_request("http://collector.example.com:4318/v1/traces"))
        .await
        .expect("response");

    assert_eq!(inner.recorded_requests().len(), 1, "request forwarded");
    assert!(exporter.get_finished_spans().expect("spans").is_empty());
}

#[tokio::test]
async fn disabled_pin_is_not_traced() {
    let (exporter, pin) = test_pin();
    let client = TracedClient::with_pin(MockClient::with_status(200), pin.with_enabled(false));

    client
        .send_bytes(get_request("http://example.com/"))
        .await
        .expect("response");

    assert!(exporter.get_finished_spans().expect("spans").is_empty());
}

#[tokio::test]
async fn captured_headers_respect_allowlist() {
    let (exporter, pin) = test_pin();
    let client = TracedClient::with_pin(MockClient::with_status(200), pin).with_config(
        IntegrationConfig::default().with_request_headers(["x-request-id"]),
    );

    let mut request = get_request("http://example.com/");
    request
        .headers_mut()
        .insert("x-request-id", "abc-123".parse().unwrap());
    request
        .headers_mut()
        .insert("authorization", "Bearer secret".parse().unwrap());
    client.send_bytes(request).await.expect("response");

    let spans = exporter.get_finished_spans().expect("spans");
    let span = &spans[0];
    assert_eq!(
        attribute(span, "http.request.header.x-request-id"),
        Some(&Value::from("abc-123"))
    );
    assert!(attribute(span, "http.request.header.authorization").is_none());
}

#[tokio::test]
async fn injected_propagation_headers_are_not_captured() {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let (exporter, pin) = test_pin();
    let inner = MockClient::with_status(200);
    let client = TracedClient::with_pin(inner.clone(), pin).with_config(
        IntegrationConfig::default()
            .with_distributed_tracing(true)
            .with_request_headers(["traceparent"]),
    );

    client
        .send_bytes(get_request("http://example.com/"))
        .await
        .expect("response");

    let sent = inner.recorded_requests();
    assert!(sent[0].headers().contains_key("traceparent"));

    let spans = exporter.get_finished_spans().expect("spans");
    assert!(
        attribute(&spans[0], "http.request.header.traceparent").is_none(),
        "capture reflects what the application set, not injected headers"
    );
}
