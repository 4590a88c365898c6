use http::{Method, Uri};
use opentelemetry::KeyValue;
use opentelemetry_instrumentation::{attribute, IntegrationConfig};
use opentelemetry_semantic_conventions::attribute::{
    HTTP_REQUEST_METHOD, URL_FULL, URL_QUERY,
};
use url::Url;

/// Attributes recorded when a request span is opened.
///
/// URL formatting can fail on unusual URIs; that is an instrumentation fault,
/// so it is logged at debug level and the attribute is skipped rather than
/// surfaced to the caller.
pub(crate) fn request_attributes(
    method: &Method,
    uri: &Uri,
    config: &IntegrationConfig,
    service: Option<&str>,
) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new(HTTP_REQUEST_METHOD, method.as_str().to_string()),
        KeyValue::new(attribute::SPAN_TYPE, "http"),
    ];

    match sanitized_url(uri) {
        Ok(url) => attributes.push(KeyValue::new(URL_FULL, url)),
        Err(err) => {
            opentelemetry::otel_debug!(
                name: "HttpInstrumentation.UrlTagFailed",
                reason = err.to_string()
            );
        }
    }

    if config.trace_query_string {
        if let Some(query) = uri.query() {
            attributes.push(KeyValue::new(URL_QUERY, query.to_string()));
        }
    }
    if let Some(service) = service {
        attributes.push(KeyValue::new(attribute::PEER_SERVICE, service.to_string()));
    }
    if let Some(rate) = config.effective_analytics_sample_rate() {
        attributes.push(KeyValue::new(attribute::ANALYTICS_SAMPLE_RATE, rate));
    }

    attributes
}

/// The request URL with query string and fragment dropped.
///
/// Query strings regularly carry credentials, so they are only recorded when
/// the integration opts in through `trace_query_string`, and then under their
/// own attribute.
fn sanitized_url(uri: &Uri) -> Result<String, url::ParseError> {
    let mut url = Url::parse(&uri.to_string())?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.into())
}
