use std::env;

/// Per-integration configuration toggles.
///
/// Every integration owns one of these, built from the integration's defaults
/// and overridden from the environment. For an integration named `http`, the
/// recognized variables are:
///
/// * `OTEL_INSTRUMENTATION_HTTP_DISTRIBUTED_TRACING` - inject propagation
///   headers into outgoing requests (`true`/`false`).
/// * `OTEL_INSTRUMENTATION_HTTP_TRACE_QUERY_STRING` - record the request
///   query string on spans instead of dropping it.
/// * `OTEL_INSTRUMENTATION_HTTP_ANALYTICS_ENABLED` and
///   `OTEL_INSTRUMENTATION_HTTP_ANALYTICS_SAMPLE_RATE` - opt spans of this
///   integration into event analytics at the given rate.
/// * `OTEL_INSTRUMENTATION_HTTP_REQUEST_HEADERS` and
///   `OTEL_INSTRUMENTATION_HTTP_RESPONSE_HEADERS` - comma separated
///   allowlists of headers to capture as span attributes.
///
/// Unparsable values are logged at warn level and fall back to the default.
#[derive(Clone, Debug)]
pub struct IntegrationConfig {
    /// Inject distributed tracing headers into outgoing requests.
    pub distributed_tracing: bool,
    /// Record the query string of traced URLs. Off by default, query strings
    /// regularly carry credentials and tokens.
    pub trace_query_string: bool,
    /// Whether spans of this integration participate in event analytics.
    pub analytics_enabled: bool,
    /// Sample rate applied when `analytics_enabled` is set, from 0.0 to 1.0.
    pub analytics_sample_rate: f64,
    /// Lowercase names of request headers to capture as span attributes.
    pub request_headers: Vec<String>,
    /// Lowercase names of response headers to capture as span attributes.
    pub response_headers: Vec<String>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        IntegrationConfig {
            distributed_tracing: false,
            trace_query_string: false,
            analytics_enabled: false,
            analytics_sample_rate: 1.0,
            request_headers: Vec::new(),
            response_headers: Vec::new(),
        }
    }
}

impl IntegrationConfig {
    /// Build the configuration for the named integration, applying
    /// environment variable overrides on top of the defaults.
    pub fn new(integration: &str) -> Self {
        IntegrationConfig::default().with_env_overrides(integration)
    }

    /// Apply environment variable overrides for the named integration.
    pub fn with_env_overrides(mut self, integration: &str) -> Self {
        if let Some(value) = read_bool(integration, "DISTRIBUTED_TRACING") {
            self.distributed_tracing = value;
        }
        if let Some(value) = read_bool(integration, "TRACE_QUERY_STRING") {
            self.trace_query_string = value;
        }
        if let Some(value) = read_bool(integration, "ANALYTICS_ENABLED") {
            self.analytics_enabled = value;
        }
        if let Some(value) = read_f64(integration, "ANALYTICS_SAMPLE_RATE") {
            self.analytics_sample_rate = value;
        }
        if let Some(value) = read_list(integration, "REQUEST_HEADERS") {
            self.request_headers = value;
        }
        if let Some(value) = read_list(integration, "RESPONSE_HEADERS") {
            self.response_headers = value;
        }
        self
    }

    /// Toggle distributed tracing header injection.
    pub fn with_distributed_tracing(mut self, enabled: bool) -> Self {
        self.distributed_tracing = enabled;
        self
    }

    /// Toggle query string capture.
    pub fn with_trace_query_string(mut self, enabled: bool) -> Self {
        self.trace_query_string = enabled;
        self
    }

    /// Opt spans into event analytics at the given sample rate.
    pub fn with_analytics_sample_rate(mut self, rate: f64) -> Self {
        self.analytics_enabled = true;
        self.analytics_sample_rate = rate;
        self
    }

    /// Set the allowlist of request headers captured as span attributes.
    pub fn with_request_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request_headers = headers
            .into_iter()
            .map(|h| h.into().to_lowercase())
            .collect();
        self
    }

    /// Set the allowlist of response headers captured as span attributes.
    pub fn with_response_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response_headers = headers
            .into_iter()
            .map(|h| h.into().to_lowercase())
            .collect();
        self
    }

    /// The sample rate to record on spans, `None` when analytics is disabled.
    pub fn effective_analytics_sample_rate(&self) -> Option<f64> {
        self.analytics_enabled.then_some(self.analytics_sample_rate)
    }
}

fn env_key(integration: &str, setting: &str) -> String {
    format!(
        "OTEL_INSTRUMENTATION_{}_{}",
        integration.to_uppercase().replace('-', "_"),
        setting
    )
}

fn read_bool(integration: &str, setting: &str) -> Option<bool> {
    let key = env_key(integration, setting);
    let raw = env::var(&key).ok()?;
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => {
            opentelemetry::otel_warn!(
                name: "IntegrationConfig.InvalidBool",
                key = key.clone(),
                value = raw.clone()
            );
            None
        }
    }
}

fn read_f64(integration: &str, setting: &str) -> Option<f64> {
    let key = env_key(integration, setting);
    let raw = env::var(&key).ok()?;
    match raw.trim().parse::<f64>() {
        Ok(value) if (0.0..=1.0).contains(&value) => Some(value),
        _ => {
            opentelemetry::otel_warn!(
                name: "IntegrationConfig.InvalidSampleRate",
                key = key.clone(),
                value = raw.clone()
            );
            None
        }
    }
}

fn read_list(integration: &str, setting: &str) -> Option<Vec<String>> {
    let raw = env::var(env_key(integration, setting)).ok()?;
    Some(
        raw.split(',')
            .map(|part| part.trim().to_lowercase())
            .filter(|part| !part.is_empty())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults() {
        let config = IntegrationConfig::default();
        assert!(!config.distributed_tracing);
        assert!(!config.trace_query_string);
        assert_eq!(config.effective_analytics_sample_rate(), None);
    }

    #[rstest]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case("1", true)]
    #[case("false", false)]
    #[case("0", false)]
    fn bool_override(#[case] raw: &str, #[case] expected: bool) {
        temp_env::with_var(
            "OTEL_INSTRUMENTATION_HTTP_DISTRIBUTED_TRACING",
            Some(raw),
            || {
                let config = IntegrationConfig::new("http");
                assert_eq!(config.distributed_tracing, expected);
            },
        );
    }

    #[test]
    fn invalid_bool_falls_back_to_default() {
        temp_env::with_var(
            "OTEL_INSTRUMENTATION_HTTP_DISTRIBUTED_TRACING",
            Some("yes please"),
            || {
                let config = IntegrationConfig::new("http");
                assert!(!config.distributed_tracing);
            },
        );
    }

    #[test]
    fn sample_rate_override() {
        temp_env::with_vars(
            [
                ("OTEL_INSTRUMENTATION_AWS_ANALYTICS_ENABLED", Some("true")),
                ("OTEL_INSTRUMENTATION_AWS_ANALYTICS_SAMPLE_RATE", Some("0.5")),
            ],
            || {
                let config = IntegrationConfig::new("aws");
                assert_eq!(config.effective_analytics_sample_rate(), Some(0.5));
            },
        );
    }

    #[test]
    fn out_of_range_sample_rate_is_rejected() {
        temp_env::with_var(
            "OTEL_INSTRUMENTATION_AWS_ANALYTICS_SAMPLE_RATE",
            Some("3.5"),
            || {
                let config = IntegrationConfig::new("aws");
                assert_eq!(config.analytics_sample_rate, 1.0);
            },
        );
    }

    #[test]
    fn header_lists_are_normalized() {
        temp_env::with_var(
            "OTEL_INSTRUMENTATION_HTTP_REQUEST_HEADERS",
            Some("Content-Type, X-Request-Id,,"),
            || {
                let config = IntegrationConfig::new("http");
                assert_eq!(config.request_headers, vec!["content-type", "x-request-id"]);
            },
        );
    }

    #[test]
    fn integration_name_is_uppercased() {
        temp_env::with_var(
            "OTEL_INSTRUMENTATION_TEST_HARNESS_TRACE_QUERY_STRING",
            Some("true"),
            || {
                let config = IntegrationConfig::new("test-harness");
                assert!(config.trace_query_string);
            },
        );
    }
}
