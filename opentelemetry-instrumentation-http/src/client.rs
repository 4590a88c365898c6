use async_trait::async_trait;
use http::Uri;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_http::{Bytes, HeaderInjector, HttpClient, HttpError, Request, Response};
use opentelemetry_instrumentation::headers::{
    request_header_attributes, response_header_attributes,
};
use opentelemetry_instrumentation::{IntegrationConfig, Pin};
use opentelemetry_semantic_conventions::attribute::HTTP_RESPONSE_STATUS_CODE;

use crate::tag::request_attributes;
use crate::{INTEGRATION, SCOPE, SPAN_NAME};

/// A tracing facade over any [`HttpClient`].
///
/// Each `send_bytes` call is traced as one client span covering the full
/// request/response cycle. The span's status is set to error if and only if
/// the wrapped call returned an error or the response carried a server error
/// status; either way the caller receives exactly what the wrapped client
/// produced.
///
/// Requests to authorities registered through [`skip_authority`] are forwarded
/// untraced. Register the telemetry collector endpoint here so exporting spans
/// does not itself produce spans.
///
/// [`skip_authority`]: TracedClient::skip_authority
#[derive(Debug)]
pub struct TracedClient<C> {
    inner: C,
    pin: Pin,
    config: IntegrationConfig,
    untraced_authorities: Vec<String>,
}

impl<C> TracedClient<C> {
    /// Wrap a client with a default [`Pin`], tracing through the global
    /// tracer provider.
    pub fn new(inner: C) -> Self {
        TracedClient::with_pin(inner, Pin::default())
    }

    /// Wrap a client with the given [`Pin`].
    pub fn with_pin(inner: C, pin: Pin) -> Self {
        TracedClient {
            inner,
            pin,
            config: IntegrationConfig::new(INTEGRATION),
            untraced_authorities: Vec::new(),
        }
    }

    /// Replace the integration configuration.
    pub fn with_config(mut self, config: IntegrationConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward requests to the given authority (`host` or `host:port`)
    /// without tracing them.
    pub fn skip_authority(mut self, authority: impl Into<String>) -> Self {
        self.untraced_authorities.push(authority.into().to_lowercase());
        self
    }

    /// A reference to the wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwrap, returning the inner client.
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn should_skip(&self, uri: &Uri) -> bool {
        let authority = match uri.authority() {
            Some(authority) => authority.as_str().to_lowercase(),
            None => return false,
        };
        let host = uri.host().unwrap_or_default().to_lowercase();
        self.untraced_authorities
            .iter()
            .any(|skip| *skip == authority || *skip == host)
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for TracedClient<C> {
    async fn send_bytes(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        if !crate::is_enabled() || !self.pin.enabled() || self.should_skip(request.uri()) {
            return self.inner.send_bytes(request).await;
        }

        let tracer = self.pin.tracer(SCOPE);
        let span = tracer
            .span_builder(SPAN_NAME)
            .with_kind(SpanKind::Client)
            .with_attributes(request_attributes(
                request.method(),
                request.uri(),
                &self.config,
                self.pin.service(),
            ))
            .start(&*tracer);
        let cx = Context::current_with_span(span);

        // Capture before injection so the allowlist sees the headers the
        // application set, not the ones added for propagation.
        for attribute in request_header_attributes(request.headers(), &self.config.request_headers)
        {
            cx.span().set_attribute(attribute);
        }
        if self.config.distributed_tracing {
            global::get_text_map_propagator(|propagator| {
                propagator.inject_context(&cx, &mut HeaderInjector(request.headers_mut()))
            });
        }

        match self.inner.send_bytes(request).await {
            Ok(response) => {
                let span = cx.span();
                span.set_attribute(KeyValue::new(
                    HTTP_RESPONSE_STATUS_CODE,
                    response.status().as_u16() as i64,
                ));
                for attribute in
                    response_header_attributes(response.headers(), &self.config.response_headers)
                {
                    span.set_attribute(attribute);
                }
                if response.status().is_server_error() {
                    span.set_status(Status::error(format!(
                        "server error status {}",
                        response.status().as_u16()
                    )));
                }
                span.end();
                Ok(response)
            }
            Err(err) => {
                let span = cx.span();
                span.record_error(err.as_ref());
                span.set_status(Status::error(err.to_string()));
                span.end();
                Err(err)
            }
        }
    }
}
