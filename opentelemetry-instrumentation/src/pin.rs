use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use opentelemetry::global::{self, BoxedTracer};

/// Per-object instrumentation handle.
///
/// A `Pin` is attached to each instrumented object (an HTTP client, an SDK
/// client, a test session) and locates the tracing context for calls made
/// through it: the service name to report, the tracer to create spans with,
/// and whether tracing is enabled for this particular object.
///
/// When no tracer is attached, spans are created through the globally
/// registered tracer provider, so a plain `Pin::default()` is the common case
/// and tests can attach their own tracer to observe spans in isolation.
#[derive(Clone)]
pub struct Pin {
    service: Option<Cow<'static, str>>,
    tracer: Option<Arc<BoxedTracer>>,
    enabled: bool,
}

impl Pin {
    /// Create a pin reporting the given service name, tracing through the
    /// global tracer provider.
    pub fn new(service: impl Into<Cow<'static, str>>) -> Self {
        Pin {
            service: Some(service.into()),
            ..Pin::default()
        }
    }

    /// Attach a specific tracer to this pin instead of the global one.
    pub fn with_tracer(mut self, tracer: BoxedTracer) -> Self {
        self.tracer = Some(Arc::new(tracer));
        self
    }

    /// Toggle tracing for the object this pin is attached to.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether calls through the pinned object should be traced.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The service name reported for spans created through this pin, if any.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// The tracer spans for the pinned object are created with.
    ///
    /// Falls back to the global tracer provider under the given
    /// instrumentation scope when no tracer was attached.
    pub fn tracer(&self, scope: &'static str) -> Arc<BoxedTracer> {
        match &self.tracer {
            Some(tracer) => tracer.clone(),
            None => Arc::new(global::tracer(scope)),
        }
    }
}

impl Default for Pin {
    fn default() -> Self {
        Pin {
            service: None,
            tracer: None,
            enabled: true,
        }
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pin")
            .field("service", &self.service)
            .field("enabled", &self.enabled)
            .field("has_tracer", &self.tracer.is_some())
            .finish()
    }
}
