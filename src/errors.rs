//! Error handling integration for metric models
//!
//! Semantic constructors for the failures this crate can produce, built on
//! the TYL framework error type instead of a crate-local error enum.

use super::*;

/// Create a validation error for a metric input
///
/// # Example
/// ```rust
/// use spotlight_metrics::metric_validation_error;
///
/// let error = metric_validation_error("source_file_name", "Names cannot contain spaces");
/// assert!(error.to_string().contains("spaces"));
/// ```
pub fn metric_validation_error(field: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::validation(field.into(), message.into())
}

/// Create a configuration error for a data source or content document
pub fn metric_config_error(config_key: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::configuration(format!(
        "Metric config error for {}: {}",
        config_key.into(),
        message.into()
    ))
}

/// Create an error for a malformed tenant content document
pub fn content_error(tenant: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::configuration(format!(
        "Tenant content error for {}: {}",
        tenant.into(),
        message.into()
    ))
}

/// Create a transport error raised by a raw-data source
///
/// # Arguments
/// * `source` - The data source that failed (e.g. "mock", an API base URL)
/// * `message` - Description of the failure
pub fn metric_source_error(source: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::network(format!(
        "Metric data source error from {}: {}",
        source.into(),
        message.into()
    ))
}

/// Create an error for a fetch that could not complete
pub fn metric_fetch_error(metric_name: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::network(format!(
        "Metric fetch error for {}: {}",
        metric_name.into(),
        message.into()
    ))
}

/// Create the error recorded when a fetch is dropped while its request is in flight
pub fn metric_fetch_cancelled_error(metric_name: impl Into<String>) -> TylError {
    TylError::network(format!(
        "Metric fetch cancelled for {}: request dropped before completion",
        metric_name.into()
    ))
}

/// Create the error recorded when the data source returns no response at all
///
/// # Example
/// ```rust
/// use spotlight_metrics::metric_data_unavailable_error;
///
/// let error = metric_data_unavailable_error("recidivism_rates_by_cohort_by_year", "US_ND");
/// assert!(error.to_string().contains("US_ND"));
/// ```
pub fn metric_data_unavailable_error(
    source_file_name: impl Into<String>,
    tenant: impl Into<String>,
) -> TylError {
    TylError::network(format!(
        "Metric data unavailable: no response for {} (tenant {})",
        source_file_name.into(),
        tenant.into()
    ))
}

/// Helper trait for adding metric context to existing errors
pub trait MetricErrorExt {
    /// Add metric name context to an existing error by wrapping it
    fn with_metric_name(self, metric_name: impl Into<String>) -> TylError;

    /// Add tenant context to an existing error by wrapping it
    fn with_tenant(self, tenant: impl Into<String>) -> TylError;
}

impl MetricErrorExt for TylError {
    fn with_metric_name(self, metric_name: impl Into<String>) -> TylError {
        TylError::internal(format!("Metric [{}]: {}", metric_name.into(), self))
    }

    fn with_tenant(self, tenant: impl Into<String>) -> TylError {
        TylError::internal(format!("Tenant [{}]: {}", tenant.into(), self))
    }
}

/// Convert a JSON decoding failure into a content error
///
/// Note: a helper function rather than a From impl to avoid orphan rule issues
pub fn from_serde_json_error(error: serde_json::Error) -> TylError {
    TylError::configuration(format!("Metric JSON decoding error: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_validation_error() {
        let error = metric_validation_error("tenant_id", "Unknown tenant");
        assert!(error.to_string().contains("Unknown tenant"));
    }

    #[test]
    fn test_metric_config_error() {
        let error = metric_config_error("failure_rate", "Out of range");
        assert!(error.to_string().contains("failure_rate"));
        assert!(error.to_string().contains("Out of range"));
    }

    #[test]
    fn test_content_error() {
        let error = content_error("US_ND", "missing metrics section");
        assert!(error.to_string().contains("missing metrics section"));
    }

    #[test]
    fn test_metric_source_error() {
        let error = metric_source_error("mock", "Connection refused");
        assert!(error.to_string().contains("Connection refused"));
    }

    #[test]
    fn test_metric_fetch_cancelled_error() {
        let error = metric_fetch_cancelled_error("Prison Population");
        let message = error.to_string();
        assert!(message.contains("Prison Population"));
        assert!(message.contains("cancelled"));
    }

    #[test]
    fn test_metric_data_unavailable_error() {
        let error = metric_data_unavailable_error("supervision_success_by_month", "US_PA");
        let message = error.to_string();
        assert!(message.contains("supervision_success_by_month"));
        assert!(message.contains("US_PA"));
    }

    #[test]
    fn test_error_extension_trait() {
        let extended = metric_source_error("mock", "timed out")
            .with_metric_name("Prison Population")
            .with_tenant("US_ND");

        let message = extended.to_string();
        assert!(message.contains("Prison Population"));
        assert!(message.contains("US_ND"));
        assert!(message.contains("timed out"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = from_serde_json_error(json_error);
        assert!(error.to_string().contains("JSON"));
    }
}
