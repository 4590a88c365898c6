//! OpenTelemetry tracing for HTTP client libraries.
//!
//! Runtime method interception is not available to compiled programs, so this
//! integration takes the wrapper route: the application composes its real
//! client behind a tracing facade implementing the same
//! [`HttpClient`](opentelemetry_http::HttpClient) interface, and everything
//! downstream of the facade is traced without further changes.
//!
//! Two facades are provided:
//!
//! * [`TracedClient`] wraps any [`HttpClient`](opentelemetry_http::HttpClient)
//!   and traces each `send_bytes` call as one client span, from request start
//!   to response (or error).
//! * [`TracedConnection`] tracks the staged request lifecycle of lower-level
//!   clients that build requests incrementally: start the request, add
//!   headers, read the response. It keeps the open span for the in-flight
//!   request cycle and finishes it exactly once, on response or on failure.
//!
//! Instrumentation is applied process-wide with [`enable`] and removed with
//! [`disable`]; both are idempotent. While disabled, the facades forward calls
//! untouched and produce no spans.
//!
//! ```
//! use opentelemetry_http::HttpClient;
//! use opentelemetry_instrumentation::{IntegrationConfig, Pin};
//! use opentelemetry_instrumentation_http::TracedClient;
//!
//! fn build<C: HttpClient>(inner: C) -> TracedClient<C> {
//!     opentelemetry_instrumentation_http::enable();
//!
//!     TracedClient::with_pin(inner, Pin::new("checkout-service"))
//!         .with_config(IntegrationConfig::new("http").with_distributed_tracing(true))
//! }
//! ```
//!
//! Errors returned by the wrapped client are recorded on the span and handed
//! back to the caller unchanged; failures inside the instrumentation itself
//! are logged at debug level and never alter the outcome of the wrapped call.

#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod client;
mod connection;
mod tag;

pub use client::TracedClient;
pub use connection::TracedConnection;

use opentelemetry_instrumentation::InstrumentationFlag;

/// Name given to every HTTP client span produced by this integration.
///
/// Backends that want per-endpoint granularity should read the
/// `resource.name` attribute instead of the span name.
pub const SPAN_NAME: &str = "http.client.request";

pub(crate) const INTEGRATION: &str = "http";
pub(crate) const SCOPE: &str = "opentelemetry-instrumentation-http";

static INSTRUMENTATION: InstrumentationFlag = InstrumentationFlag::new();

/// Apply HTTP client instrumentation process-wide.
///
/// Idempotent; applying twice is equivalent to applying once.
pub fn enable() {
    if INSTRUMENTATION.enable() {
        opentelemetry::otel_debug!(name: "HttpInstrumentation.Enabled");
    }
}

/// Remove HTTP client instrumentation process-wide.
///
/// Subsequent calls through [`TracedClient`] and [`TracedConnection`] forward
/// to the wrapped client without producing spans. Idempotent.
pub fn disable() {
    if INSTRUMENTATION.disable() {
        opentelemetry::otel_debug!(name: "HttpInstrumentation.Disabled");
    }
}

/// Whether HTTP client instrumentation is currently applied.
pub fn is_enabled() -> bool {
    INSTRUMENTATION.is_enabled()
}
