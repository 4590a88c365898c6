//! Shared building blocks for instrumenting third-party client libraries with
//! OpenTelemetry.
//!
//! Integration crates (HTTP clients, cloud SDKs, test harnesses) wrap the real
//! client behind a tracing facade that opens a span per call, annotates it, and
//! finishes it on both the success and the failure path. This crate carries the
//! pieces every integration needs:
//!
//! * [`Pin`] - a per-object handle carrying the tracer and service name used by
//!   an instrumented object, falling back to the global tracer provider.
//! * [`IntegrationConfig`] - per-integration toggles (propagation header
//!   injection, query string capture, analytics sampling, header capture)
//!   with environment variable overrides.
//! * [`InstrumentationFlag`] - the process-wide idempotent enable/disable
//!   switch behind each integration's `enable()`/`disable()` entry points.
//! * [`attribute`] - span attribute keys shared across integrations.
//! * [`headers`] - allowlist-driven capture of request/response headers as
//!   span attributes.
//!
//! Instrumentation failures are never allowed to surface to the caller of the
//! wrapped library: integrations log them at debug level through the
//! `opentelemetry` internal logging macros and carry on, while errors raised
//! by the wrapped call itself are recorded on the open span and returned to
//! the caller unchanged.

#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod attribute;
mod config;
mod flag;
pub mod headers;
mod pin;

pub use config::IntegrationConfig;
pub use flag::InstrumentationFlag;
pub use pin::Pin;
