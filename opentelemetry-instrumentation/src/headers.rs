//! Allowlist-driven capture of HTTP headers as span attributes.
//!
//! Integrations never capture headers wholesale. The operator opts specific
//! headers in through [`IntegrationConfig`](crate::IntegrationConfig) and only
//! those are recorded, under `http.request.header.<name>` /
//! `http.response.header.<name>` keys.

use http::HeaderMap;
use opentelemetry::KeyValue;

use crate::attribute::{HTTP_REQUEST_HEADER_PREFIX, HTTP_RESPONSE_HEADER_PREFIX};

/// Attributes for the allowlisted request headers present in `headers`.
///
/// Allowlist entries are expected in lowercase; header name matching itself is
/// case insensitive. Headers with non-ASCII values are skipped.
pub fn request_header_attributes(headers: &HeaderMap, allowlist: &[String]) -> Vec<KeyValue> {
    capture(headers, allowlist, HTTP_REQUEST_HEADER_PREFIX)
}

/// Attributes for the allowlisted response headers present in `headers`.
pub fn response_header_attributes(headers: &HeaderMap, allowlist: &[String]) -> Vec<KeyValue> {
    capture(headers, allowlist, HTTP_RESPONSE_HEADER_PREFIX)
}

fn capture(headers: &HeaderMap, allowlist: &[String], prefix: &str) -> Vec<KeyValue> {
    allowlist
        .iter()
        .filter_map(|name| {
            let value = headers.get(name.as_str())?.to_str().ok()?;
            Some(KeyValue::new(
                format!("{prefix}{name}"),
                value.to_string(),
            ))
        })
        .collect()
}
