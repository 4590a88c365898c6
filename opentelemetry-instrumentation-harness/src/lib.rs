//! OpenTelemetry tracing for test harnesses and custom test runners.
//!
//! A [`TestSession`] traces every test case it runs as one span tagged with
//! the suite, the case name, and the outcome (`pass`, `fail` or `skip`).
//! Panics inside a case are caught, recorded on the span, and reported as a
//! failed outcome instead of tearing down the runner.
//!
//! ```
//! use opentelemetry_instrumentation_harness::{CaseStatus, TestSession};
//!
//! opentelemetry_instrumentation_harness::enable();
//!
//! let mut session = TestSession::new("checkout");
//! session.run_case("adds_item_to_cart", |cx| {
//!     // the open test span is reachable for custom tags
//!     use opentelemetry::trace::TraceContextExt;
//!     cx.span().set_attribute(opentelemetry::KeyValue::new("cart.items", 3));
//!     CaseStatus::Passed
//! });
//! session.skip_case("flaky_on_ci", "tracked in #482");
//!
//! let summary = session.summary();
//! assert_eq!(summary.passed, 1);
//! assert_eq!(summary.skipped, 1);
//! ```
//!
//! Tracing never changes what the runner observes: outcomes are tallied the
//! same whether instrumentation is enabled or not.

#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use std::any::Any;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};

use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use opentelemetry_instrumentation::{attribute, IntegrationConfig, InstrumentationFlag, Pin};
use opentelemetry_semantic_conventions::attribute::EXCEPTION_MESSAGE;

const INTEGRATION: &str = "harness";
const SCOPE: &str = "opentelemetry-instrumentation-harness";

/// Name given to every test case span.
pub const SPAN_NAME: &str = "test.case";

static INSTRUMENTATION: InstrumentationFlag = InstrumentationFlag::new();

/// Apply test harness instrumentation process-wide. Idempotent.
pub fn enable() {
    if INSTRUMENTATION.enable() {
        opentelemetry::otel_debug!(name: "HarnessInstrumentation.Enabled");
    }
}

/// Remove test harness instrumentation process-wide. Idempotent.
pub fn disable() {
    if INSTRUMENTATION.disable() {
        opentelemetry::otel_debug!(name: "HarnessInstrumentation.Disabled");
    }
}

/// Whether test harness instrumentation is currently applied.
pub fn is_enabled() -> bool {
    INSTRUMENTATION.is_enabled()
}

/// The configuration for this integration, with
/// `OTEL_INSTRUMENTATION_HARNESS_*` environment overrides applied.
pub fn config() -> IntegrationConfig {
    IntegrationConfig::new(INTEGRATION)
}

/// Outcome a test case resolved with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaseStatus {
    /// The case ran to completion.
    Passed,
    /// The case reported a failure (or panicked).
    Failed,
    /// The case was not run.
    Skipped(Cow<'static, str>),
}

impl CaseStatus {
    fn tag(&self) -> &'static str {
        match self {
            CaseStatus::Passed => "pass",
            CaseStatus::Failed => "fail",
            CaseStatus::Skipped(_) => "skip",
        }
    }
}

/// Tallied outcomes of a session's cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Cases that passed.
    pub passed: usize,
    /// Cases that failed or panicked.
    pub failed: usize,
    /// Cases that were skipped.
    pub skipped: usize,
}

/// Runs test cases, tracing each as one span.
#[derive(Debug)]
pub struct TestSession {
    suite: String,
    pin: Pin,
    config: IntegrationConfig,
    summary: Summary,
}

impl TestSession {
    /// Create a session for the named suite, tracing through the global
    /// tracer provider.
    pub fn new(suite: impl Into<String>) -> Self {
        TestSession::with_pin(suite, Pin::default())
    }

    /// Create a session with the given [`Pin`].
    pub fn with_pin(suite: impl Into<String>, pin: Pin) -> Self {
        TestSession {
            suite: suite.into(),
            pin,
            config: config(),
            summary: Summary::default(),
        }
    }

    /// Replace the integration configuration.
    pub fn with_config(mut self, config: IntegrationConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one test case.
    ///
    /// The case receives the [`Context`] holding the open test span, so it
    /// can attach custom tags. A panic inside the case is caught and counted
    /// as a failure; the panic message is recorded on the span.
    pub fn run_case<F>(&mut self, name: &str, case: F) -> CaseStatus
    where
        F: FnOnce(&Context) -> CaseStatus,
    {
        let cx = self.start_case(name);
        // cases of an untraced session still run, against a span-less context
        let case_cx = cx.clone().unwrap_or_else(Context::new);
        let status = match panic::catch_unwind(AssertUnwindSafe(|| case(&case_cx))) {
            Ok(status) => status,
            Err(payload) => {
                if let Some(cx) = &cx {
                    cx.span().add_event(
                        "panic",
                        vec![KeyValue::new(EXCEPTION_MESSAGE, panic_message(payload.as_ref()))],
                    );
                }
                CaseStatus::Failed
            }
        };
        self.finish_case(cx, &status);
        status
    }

    /// Record a case that was not run.
    pub fn skip_case(&mut self, name: &str, reason: impl Into<Cow<'static, str>>) -> CaseStatus {
        let cx = self.start_case(name);
        let status = CaseStatus::Skipped(reason.into());
        self.finish_case(cx, &status);
        status
    }

    /// Outcomes tallied so far.
    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Suite name the session reports.
    pub fn suite(&self) -> &str {
        &self.suite
    }

    fn start_case(&self, name: &str) -> Option<Context> {
        if !is_enabled() || !self.pin.enabled() {
            return None;
        }

        let mut attributes = vec![
            KeyValue::new(attribute::SPAN_TYPE, "test"),
            KeyValue::new(attribute::TEST_FRAMEWORK, "rust"),
            KeyValue::new(attribute::TEST_SUITE, self.suite.clone()),
            KeyValue::new(attribute::TEST_NAME, name.to_string()),
            KeyValue::new(
                attribute::RESOURCE_NAME,
                format!("{}::{}", self.suite, name),
            ),
        ];
        if let Some(service) = self.pin.service() {
            attributes.push(KeyValue::new(attribute::PEER_SERVICE, service.to_string()));
        }
        if let Some(rate) = self.config.effective_analytics_sample_rate() {
            attributes.push(KeyValue::new(attribute::ANALYTICS_SAMPLE_RATE, rate));
        }

        let tracer = self.pin.tracer(SCOPE);
        let span = tracer
            .span_builder(SPAN_NAME)
            .with_kind(SpanKind::Internal)
            .with_attributes(attributes)
            .start(&*tracer);
        Some(Context::current_with_span(span))
    }

    fn finish_case(&mut self, cx: Option<Context>, status: &CaseStatus) {
        match status {
            CaseStatus::Passed => self.summary.passed += 1,
            CaseStatus::Failed => self.summary.failed += 1,
            CaseStatus::Skipped(_) => self.summary.skipped += 1,
        }

        let Some(cx) = cx else {
            return;
        };
        let span = cx.span();
        span.set_attribute(KeyValue::new(attribute::TEST_STATUS, status.tag()));
        match status {
            CaseStatus::Failed => span.set_status(Status::error("test failed")),
            CaseStatus::Skipped(reason) => {
                span.set_attribute(KeyValue::new(
                    attribute::TEST_SKIP_REASON,
                    reason.to_string(),
                ));
            }
            CaseStatus::Passed => {}
        }
        span.end();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tags() {
        assert_eq!(CaseStatus::Passed.tag(), "pass");
        assert_eq!(CaseStatus::Failed.tag(), "fail");
        assert_eq!(CaseStatus::Skipped("why".into()).tag(), "skip");
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "test panicked");
    }
}
