//! Raw-data source port
//!
//! The metrics API is an external collaborator; this module only fixes the
//! contract every adapter (HTTP client, fixture loader, mock) must honor.

use super::*;
use async_trait::async_trait;

/// **Primary Port Interface** for raw metric data
///
/// Given a tenant and a list of source file names, an adapter returns the
/// rows of each file it found. Returning `Ok(None)` means the API produced
/// no usable response at all; a response that simply lacks one of the
/// requested files is `Ok(Some(..))` without that key.
///
/// ## Example Implementation
/// ```rust
/// use spotlight_metrics::{
///     async_trait, FetchMetricsRequest, MetricDataSource, RawMetricData, Result,
/// };
///
/// struct EmptySource;
///
/// #[async_trait]
/// impl MetricDataSource for EmptySource {
///     async fn fetch_metrics(&self, _request: &FetchMetricsRequest) -> Result<Option<RawMetricData>> {
///         Ok(Some(RawMetricData::new()))
///     }
/// }
/// ```
#[async_trait]
pub trait MetricDataSource: Send + Sync {
    /// Retrieve the requested source files for one tenant
    ///
    /// Transport failures are reported as `Err`; no timeout or retry is
    /// imposed by callers, so adapters own both.
    async fn fetch_metrics(&self, request: &FetchMetricsRequest) -> Result<Option<RawMetricData>>;

    /// Short adapter label used in logs and error messages
    fn source_name(&self) -> &str {
        "metrics-api"
    }
}
