//! Span attribute keys shared across integration crates.
//!
//! HTTP attributes follow the stable OpenTelemetry semantic conventions and
//! live in the `opentelemetry-semantic-conventions` crate; the keys here cover
//! what the conventions do not: exporter hints, analytics sampling, and the
//! cloud SDK / test harness attributes emitted by the integrations in this
//! workspace.

/// Granular description of what a span represents, read by exporters (for
/// example the Datadog exporter) that keep the span name coarse and surface
/// granularity through a resource name instead.
pub const RESOURCE_NAME: &str = "resource.name";

/// Rendering hint for backends that distinguish web, http, and test spans.
pub const SPAN_TYPE: &str = "span.type";

/// Service name of the instrumented client the span was produced through,
/// taken from the `Pin` attached to it.
pub const PEER_SERVICE: &str = "peer.service";

/// Event sample rate applied to spans of this integration when analytics is
/// enabled. Ranges from 0.0 to 1.0.
pub const ANALYTICS_SAMPLE_RATE: &str = "analytics.sample_rate";

/// Name of the client library an AWS operation was issued through.
pub const AWS_AGENT: &str = "aws.agent";

/// The AWS service operation being invoked, e.g. `ListBuckets`.
pub const AWS_OPERATION: &str = "aws.operation";

/// Region the AWS operation is executed in.
pub const AWS_REGION: &str = "aws.region";

/// Request id reported by the AWS endpoint for this operation.
pub const AWS_REQUEST_ID: &str = "aws.request_id";

/// Number of retries the SDK performed before the operation resolved.
pub const AWS_RETRY_ATTEMPTS: &str = "aws.retry_attempts";

/// Prefix for captured AWS operation parameters, completed with the
/// parameter name, e.g. `aws.params.Bucket`.
pub const AWS_PARAMS_PREFIX: &str = "aws.params.";

/// Test framework a test case span was produced by.
pub const TEST_FRAMEWORK: &str = "test.framework";

/// Name of the test case.
pub const TEST_NAME: &str = "test.name";

/// Suite the test case belongs to.
pub const TEST_SUITE: &str = "test.suite";

/// Outcome of the test case: `pass`, `fail` or `skip`.
pub const TEST_STATUS: &str = "test.status";

/// Reason given when a test case was skipped.
pub const TEST_SKIP_REASON: &str = "test.skip_reason";

/// Prefix for captured request headers, completed with the lowercase header
/// name, e.g. `http.request.header.content-type`.
pub const HTTP_REQUEST_HEADER_PREFIX: &str = "http.request.header.";

/// Prefix for captured response headers, completed with the lowercase header
/// name.
pub const HTTP_RESPONSE_HEADER_PREFIX: &str = "http.response.header.";
