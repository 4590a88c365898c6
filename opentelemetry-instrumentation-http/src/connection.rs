use std::error::Error;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_http::HeaderInjector;
use opentelemetry_instrumentation::attribute::HTTP_REQUEST_HEADER_PREFIX;
use opentelemetry_instrumentation::headers::response_header_attributes;
use opentelemetry_instrumentation::{IntegrationConfig, Pin};
use opentelemetry_semantic_conventions::attribute::HTTP_RESPONSE_STATUS_CODE;

use crate::tag::request_attributes;
use crate::{INTEGRATION, SCOPE, SPAN_NAME};

/// Tracks the staged request lifecycle of a low-level HTTP connection.
///
/// Clients that build requests incrementally (start the request line, add
/// headers, later read the response) cannot be traced with a single wrapped
/// call. A `TracedConnection` is attached alongside such a connection and
/// driven from its lifecycle points:
///
/// * [`start_request`](Self::start_request) when the request line is written,
/// * [`record_request_header`](Self::record_request_header) per header,
/// * [`inject_headers`](Self::inject_headers) before the headers are sent,
/// * [`finish_response`](Self::finish_response) when the response arrives, or
///   [`fail`](Self::fail) when the exchange errors out.
///
/// The connection holds at most one open span at a time, the one for the
/// in-flight request/response cycle. Starting a request while one is open
/// reuses the open span; finishing removes it. A span is finished exactly
/// once per cycle, on the success and on the failure path alike, and an
/// abandoned cycle is finished when the `TracedConnection` is dropped.
pub struct TracedConnection {
    pin: Pin,
    config: IntegrationConfig,
    state: Mutex<Option<Context>>,
}

impl TracedConnection {
    /// Create a connection tracker with a default [`Pin`].
    pub fn new() -> Self {
        TracedConnection::with_pin(Pin::default())
    }

    /// Create a connection tracker with the given [`Pin`].
    pub fn with_pin(pin: Pin) -> Self {
        TracedConnection {
            pin,
            config: IntegrationConfig::new(INTEGRATION),
            state: Mutex::new(None),
        }
    }

    /// Replace the integration configuration.
    pub fn with_config(mut self, config: IntegrationConfig) -> Self {
        self.config = config;
        self
    }

    /// Open the span for a new request cycle.
    ///
    /// No-op while instrumentation is disabled, and when a cycle is already
    /// in flight on this connection.
    pub fn start_request(&self, method: &Method, uri: &Uri) {
        if !crate::is_enabled() || !self.pin.enabled() {
            return;
        }
        let mut state = self.lock();
        if state.is_some() {
            return;
        }

        let tracer = self.pin.tracer(SCOPE);
        let span = tracer
            .span_builder(SPAN_NAME)
            .with_kind(SpanKind::Client)
            .with_attributes(request_attributes(
                method,
                uri,
                &self.config,
                self.pin.service(),
            ))
            .start(&*tracer);
        *state = Some(Context::current_with_span(span));
    }

    /// Record an outgoing request header on the open span, if it is in the
    /// capture allowlist. No-op when no cycle is in flight.
    pub fn record_request_header(&self, name: &HeaderName, value: &HeaderValue) {
        let state = self.lock();
        let Some(cx) = state.as_ref() else {
            return;
        };
        if !self.config.request_headers.iter().any(|h| h == name.as_str()) {
            return;
        }
        match value.to_str() {
            Ok(value) => cx.span().set_attribute(KeyValue::new(
                format!("{HTTP_REQUEST_HEADER_PREFIX}{name}"),
                value.to_string(),
            )),
            Err(err) => {
                opentelemetry::otel_debug!(
                    name: "HttpInstrumentation.HeaderTagFailed",
                    reason = err.to_string()
                );
            }
        }
    }

    /// Inject distributed tracing headers for the open span into `headers`.
    ///
    /// No-op unless `distributed_tracing` is enabled and a cycle is in
    /// flight.
    pub fn inject_headers(&self, headers: &mut HeaderMap) {
        if !self.config.distributed_tracing {
            return;
        }
        let state = self.lock();
        if let Some(cx) = state.as_ref() {
            global::get_text_map_propagator(|propagator| {
                propagator.inject_context(cx, &mut HeaderInjector(headers))
            });
        }
    }

    /// Close the request cycle with the received response.
    pub fn finish_response(&self, status: StatusCode, headers: &HeaderMap) {
        let Some(cx) = self.lock().take() else {
            return;
        };
        let span = cx.span();
        span.set_attribute(KeyValue::new(
            HTTP_RESPONSE_STATUS_CODE,
            status.as_u16() as i64,
        ));
        for attribute in response_header_attributes(headers, &self.config.response_headers) {
            span.set_attribute(attribute);
        }
        if status.is_server_error() {
            span.set_status(Status::error(format!(
                "server error status {}",
                status.as_u16()
            )));
        }
        span.end();
    }

    /// Close the request cycle after the exchange failed.
    ///
    /// The error is recorded on the span; propagating it to the caller stays
    /// the caller's responsibility, unchanged.
    pub fn fail(&self, error: &dyn Error) {
        let Some(cx) = self.lock().take() else {
            return;
        };
        let span = cx.span();
        span.record_error(error);
        span.set_status(Status::error(error.to_string()));
        span.end();
    }

    /// Whether a request cycle is currently in flight.
    pub fn has_active_request(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Context>> {
        // A poisoned slot only means a panic elsewhere while annotating; the
        // span inside is still valid to finish.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TracedConnection {
    fn default() -> Self {
        TracedConnection::new()
    }
}

impl Drop for TracedConnection {
    fn drop(&mut self) {
        if let Some(cx) = self.lock().take() {
            opentelemetry::otel_debug!(name: "HttpInstrumentation.AbandonedRequestCycle");
            cx.span().end();
        }
    }
}

impl fmt::Debug for TracedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedConnection")
            .field("pin", &self.pin)
            .field("active", &self.has_active_request())
            .finish()
    }
}
