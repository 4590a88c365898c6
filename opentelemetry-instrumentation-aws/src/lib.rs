//! OpenTelemetry tracing for AWS SDK clients.
//!
//! The integration traces one client span per SDK operation. Since compiled
//! SDK clients cannot be intercepted at runtime, the application wires the
//! facade in at the call site: describe the operation with [`AwsOperation`],
//! then run the SDK call through [`trace_operation`].
//!
//! ```
//! use opentelemetry_instrumentation::{IntegrationConfig, Pin};
//! use opentelemetry_instrumentation_aws::{
//!     trace_operation, AwsOperation, OperationResponse,
//! };
//!
//! struct ListBucketsOutput {
//!     request_id: String,
//! }
//!
//! impl OperationResponse for ListBucketsOutput {
//!     fn request_id(&self) -> Option<&str> {
//!         Some(&self.request_id)
//!     }
//!     fn status_code(&self) -> Option<u16> {
//!         Some(200)
//!     }
//! }
//!
//! async fn list_buckets() -> Result<ListBucketsOutput, std::io::Error> {
//!     // the real SDK call goes here
//! #    Ok(ListBucketsOutput { request_id: "abc".into() })
//! }
//!
//! # async fn run() -> Result<(), std::io::Error> {
//! opentelemetry_instrumentation_aws::enable();
//!
//! let pin = Pin::new("my-service");
//! let config = IntegrationConfig::new("aws");
//! let output = trace_operation(
//!     &pin,
//!     &config,
//!     AwsOperation::new("s3", "ListBuckets")
//!         .with_region("us-west-2")
//!         .with_param("Bucket", "mybucket"),
//!     list_buckets,
//! )
//! .await?;
//! # let _ = output;
//! # Ok(())
//! # }
//! ```
//!
//! The span's status is error if and only if the call returned an error or
//! the endpoint answered with a server error status; the SDK's return value
//! and errors reach the caller unchanged either way.

#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use std::borrow::Cow;
use std::error::Error;
use std::future::Future;

use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue, Value};
use opentelemetry_instrumentation::{attribute, IntegrationConfig, InstrumentationFlag, Pin};
use opentelemetry_semantic_conventions::attribute::HTTP_RESPONSE_STATUS_CODE;

const INTEGRATION: &str = "aws";
const SCOPE: &str = "opentelemetry-instrumentation-aws";

/// Client library name recorded under `aws.agent`.
const AGENT: &str = "aws-sdk-rust";

/// Operation parameters that are never captured as span attributes: request
/// payloads and credential material.
const PARAM_DENYLIST: &[&str] = &[
    "Body",
    "Password",
    "SecretAccessKey",
    "SessionToken",
    "SSECustomerKey",
    "SSECustomerKeyMD5",
];

static INSTRUMENTATION: InstrumentationFlag = InstrumentationFlag::new();

/// Apply AWS SDK instrumentation process-wide. Idempotent.
pub fn enable() {
    if INSTRUMENTATION.enable() {
        opentelemetry::otel_debug!(name: "AwsInstrumentation.Enabled");
    }
}

/// Remove AWS SDK instrumentation process-wide. Idempotent.
///
/// Subsequent [`trace_operation`] calls run the operation without producing
/// spans.
pub fn disable() {
    if INSTRUMENTATION.disable() {
        opentelemetry::otel_debug!(name: "AwsInstrumentation.Disabled");
    }
}

/// Whether AWS SDK instrumentation is currently applied.
pub fn is_enabled() -> bool {
    INSTRUMENTATION.is_enabled()
}

/// The configuration for this integration, with `OTEL_INSTRUMENTATION_AWS_*`
/// environment overrides applied.
pub fn config() -> IntegrationConfig {
    IntegrationConfig::new(INTEGRATION)
}

/// Description of one AWS SDK operation, used to name and annotate its span.
#[derive(Clone, Debug)]
pub struct AwsOperation {
    service: Cow<'static, str>,
    operation: Cow<'static, str>,
    region: Option<Cow<'static, str>>,
    params: Vec<KeyValue>,
}

impl AwsOperation {
    /// Describe an operation, e.g. `AwsOperation::new("s3", "ListBuckets")`.
    pub fn new(
        service: impl Into<Cow<'static, str>>,
        operation: impl Into<Cow<'static, str>>,
    ) -> Self {
        AwsOperation {
            service: service.into(),
            operation: operation.into(),
            region: None,
            params: Vec::new(),
        }
    }

    /// The region the operation runs in.
    pub fn with_region(mut self, region: impl Into<Cow<'static, str>>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Capture an operation parameter as a span attribute under
    /// `aws.params.<name>`.
    ///
    /// Payload and credential parameters (`Body`, keys, tokens) are
    /// silently dropped.
    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        if PARAM_DENYLIST.contains(&name) {
            return self;
        }
        self.params.push(KeyValue::new(
            format!("{}{}", attribute::AWS_PARAMS_PREFIX, name),
            value.into(),
        ));
        self
    }

    fn span_name(&self) -> String {
        format!("{}.command", self.service)
    }

    /// `resource.name` value: `<service>.<operation>` lowercased, e.g.
    /// `s3.listbuckets`.
    fn resource(&self) -> String {
        format!("{}.{}", self.service, self.operation.to_lowercase())
    }

    fn attributes(&self, config: &IntegrationConfig, pin_service: Option<&str>) -> Vec<KeyValue> {
        let mut attributes = vec![
            KeyValue::new(attribute::SPAN_TYPE, "http"),
            KeyValue::new(attribute::AWS_AGENT, AGENT),
            KeyValue::new(attribute::AWS_OPERATION, self.operation.to_string()),
            KeyValue::new(attribute::RESOURCE_NAME, self.resource()),
        ];
        if let Some(region) = &self.region {
            attributes.push(KeyValue::new(attribute::AWS_REGION, region.to_string()));
        }
        if let Some(service) = pin_service {
            attributes.push(KeyValue::new(
                attribute::PEER_SERVICE,
                format!("{}.{}", service, self.service),
            ));
        }
        if let Some(rate) = config.effective_analytics_sample_rate() {
            attributes.push(KeyValue::new(attribute::ANALYTICS_SAMPLE_RATE, rate));
        }
        attributes.extend(self.params.iter().cloned());
        attributes
    }
}

/// Response metadata the integration reads back onto the span.
///
/// Implemented for the output types of traced operations; every method has a
/// `None` default so outputs without metadata need no boilerplate.
pub trait OperationResponse {
    /// Request id reported by the AWS endpoint.
    fn request_id(&self) -> Option<&str> {
        None
    }

    /// HTTP status the operation resolved with.
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Number of retries the SDK performed.
    fn retry_attempts(&self) -> Option<i64> {
        None
    }
}

/// Run an SDK call, tracing it as one client span.
///
/// While the integration or the pin is disabled, the call runs untraced. The
/// call's output or error is returned unchanged.
pub async fn trace_operation<F, Fut, T, E>(
    pin: &Pin,
    config: &IntegrationConfig,
    operation: AwsOperation,
    call: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    T: OperationResponse,
    E: Error,
{
    if !is_enabled() || !pin.enabled() {
        return call().await;
    }

    let tracer = pin.tracer(SCOPE);
    let span = tracer
        .span_builder(operation.span_name())
        .with_kind(SpanKind::Client)
        .with_attributes(operation.attributes(config, pin.service()))
        .start(&*tracer);
    let cx = Context::current_with_span(span);

    match call().await {
        Ok(output) => {
            let span = cx.span();
            if let Some(request_id) = output.request_id() {
                span.set_attribute(KeyValue::new(
                    attribute::AWS_REQUEST_ID,
                    request_id.to_string(),
                ));
            }
            if let Some(retries) = output.retry_attempts() {
                span.set_attribute(KeyValue::new(attribute::AWS_RETRY_ATTEMPTS, retries));
            }
            if let Some(status) = output.status_code() {
                span.set_attribute(KeyValue::new(HTTP_RESPONSE_STATUS_CODE, status as i64));
                if status >= 500 {
                    span.set_status(Status::error(format!("server error status {status}")));
                }
            }
            span.end();
            Ok(output)
        }
        Err(err) => {
            let span = cx.span();
            span.record_error(&err);
            span.set_status(Status::error(err.to_string()));
            span.end();
            Err(err)
        }
    }
}
