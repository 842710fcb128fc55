//! Mock raw-data source for testing and demos
//!
//! An in-memory [`MetricDataSource`] holding fixture rows per tenant. It
//! records every request it receives so tests can assert on traffic, and
//! can simulate latency, transport failures and absent responses.

use super::*;
use crate::utils::validate_fetch_request;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Configuration for the mock data source
#[derive(Debug, Clone, PartialEq)]
pub struct MockDataSourceConfig {
    /// Label used in logs and error messages
    pub source_name: String,

    /// Delay applied before answering each request
    pub latency: Duration,

    /// Whether to simulate transport failures
    pub simulate_failures: bool,

    /// Failure probability (0.0 to 1.0) when simulate_failures is true
    pub failure_rate: f64,

    /// Answer every request with no response at all
    pub absent_responses: bool,

    /// Maximum number of requests kept for inspection
    pub max_recorded_requests: usize,
}

impl Default for MockDataSourceConfig {
    fn default() -> Self {
        Self {
            source_name: "mock".to_string(),
            latency: Duration::ZERO,
            simulate_failures: false,
            failure_rate: 0.0,
            absent_responses: false,
            max_recorded_requests: 1000,
        }
    }
}

impl MockDataSourceConfig {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..Default::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Enable failure simulation for error handling tests
    pub fn with_failures(mut self, failure_rate: f64) -> Self {
        self.simulate_failures = failure_rate > 0.0;
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_absent_responses(mut self, absent: bool) -> Self {
        self.absent_responses = absent;
        self
    }

    pub fn with_max_recorded(mut self, max: usize) -> Self {
        self.max_recorded_requests = max;
        self
    }
}

/// In-memory data source keyed by tenant and source file
///
/// ## Example Usage
/// ```rust
/// use spotlight_metrics::{
///     raw_row, FetchMetricsRequest, MetricDataSource, MockMetricDataSource, TenantId,
/// };
///
/// # tokio_test::block_on(async {
/// let source = MockMetricDataSource::default();
/// source
///     .set_file(TenantId::UsNd, "supervision_success_by_month", vec![raw_row([("year", "2020")])])
///     .await;
///
/// let request = FetchMetricsRequest::new(TenantId::UsNd, ["supervision_success_by_month"]);
/// let response = source.fetch_metrics(&request).await.unwrap().unwrap();
/// assert_eq!(response["supervision_success_by_month"].len(), 1);
/// # });
/// ```
pub struct MockMetricDataSource {
    config: MockDataSourceConfig,

    /// Fixture rows per tenant
    data: Arc<RwLock<HashMap<TenantId, RawMetricData>>>,

    /// Requests received, oldest first
    requests: Arc<RwLock<Vec<FetchMetricsRequest>>>,

    /// Runtime override of `config.absent_responses`
    absent_responses: Arc<RwLock<bool>>,

    /// Random number generator for failure simulation
    rng: Arc<RwLock<fastrand::Rng>>,
}

impl MockMetricDataSource {
    /// Create a mock data source without validating the configuration
    pub fn new(config: MockDataSourceConfig) -> Self {
        let absent_responses = config.absent_responses;
        Self {
            config,
            data: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            absent_responses: Arc::new(RwLock::new(absent_responses)),
            rng: Arc::new(RwLock::new(fastrand::Rng::new())),
        }
    }

    /// Create a mock data source, rejecting invalid configuration
    pub async fn try_new(config: MockDataSourceConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.failure_rate) {
            return Err(metric_config_error(
                "failure_rate",
                "Failure rate must be between 0.0 and 1.0",
            ));
        }

        if config.max_recorded_requests == 0 {
            return Err(metric_config_error(
                "max_recorded_requests",
                "Maximum recorded requests must be greater than 0",
            ));
        }

        if config.source_name.trim().is_empty() {
            return Err(metric_config_error("source_name", "Source name cannot be empty"));
        }

        Ok(Self::new(config))
    }

    pub fn config(&self) -> &MockDataSourceConfig {
        &self.config
    }

    /// Store the rows of one source file for a tenant, replacing any previous rows
    pub async fn set_file(
        &self,
        tenant_id: TenantId,
        source_file_name: impl Into<String>,
        rows: Vec<RawMetricRow>,
    ) {
        self.data
            .write()
            .await
            .entry(tenant_id)
            .or_default()
            .insert(source_file_name.into(), rows);
    }

    /// Load a tenant's fixture files from a JSON object of `file -> [row]`
    pub async fn load_json(&self, tenant_id: TenantId, json: &str) -> Result<usize> {
        let files: RawMetricData = serde_json::from_str(json).map_err(from_serde_json_error)?;
        for name in files.keys() {
            validate_source_file_name(name)?;
        }

        let count = files.len();
        self.data
            .write()
            .await
            .entry(tenant_id)
            .or_default()
            .extend(files);
        Ok(count)
    }

    /// Toggle absent-response simulation at runtime
    pub async fn set_absent_responses(&self, absent: bool) {
        *self.absent_responses.write().await = absent;
    }

    /// All recorded requests, oldest first
    pub async fn requests(&self) -> Vec<FetchMetricsRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Number of recorded requests that asked for a given source file
    pub async fn requests_for(&self, source_file_name: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|request| request.metric_names.iter().any(|n| n == source_file_name))
            .count()
    }

    pub async fn clear_requests(&self) {
        self.requests.write().await.clear();
    }

    async fn record_request(&self, request: &FetchMetricsRequest) {
        let mut requests = self.requests.write().await;
        if requests.len() >= self.config.max_recorded_requests {
            requests.remove(0);
        }
        requests.push(request.clone());
    }

    /// Check if we should simulate a failure
    async fn should_fail(&self) -> bool {
        if !self.config.simulate_failures {
            return false;
        }

        let random_value = {
            let mut rng = self.rng.write().await;
            rng.f64()
        };
        random_value < self.config.failure_rate
    }
}

impl Default for MockMetricDataSource {
    fn default() -> Self {
        Self::new(MockDataSourceConfig::default())
    }
}

#[async_trait]
impl MetricDataSource for MockMetricDataSource {
    async fn fetch_metrics(&self, request: &FetchMetricsRequest) -> Result<Option<RawMetricData>> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        self.record_request(request).await;

        if self.should_fail().await {
            return Err(metric_source_error(
                self.config.source_name.as_str(),
                "Simulated transport failure",
            ));
        }

        validate_fetch_request(request)?;

        if *self.absent_responses.read().await {
            return Ok(None);
        }

        let data = self.data.read().await;
        let response = match data.get(&request.tenant_id) {
            Some(files) => request
                .metric_names
                .iter()
                .filter_map(|name| files.get(name).map(|rows| (name.clone(), rows.clone())))
                .collect(),
            None => RawMetricData::new(),
        };

        Ok(Some(response))
    }

    fn source_name(&self) -> &str {
        &self.config.source_name
    }
}

/// Builder pattern for creating mock data sources in tests
pub struct MockDataSourceBuilder {
    config: MockDataSourceConfig,
    files: Vec<(TenantId, String, Vec<RawMetricRow>)>,
}

impl MockDataSourceBuilder {
    pub fn new() -> Self {
        Self {
            config: MockDataSourceConfig::default(),
            files: Vec::new(),
        }
    }

    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.config.source_name = name.into();
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.config.latency = latency;
        self
    }

    pub fn simulate_failures(mut self, rate: f64) -> Self {
        self.config.simulate_failures = rate > 0.0;
        self.config.failure_rate = rate;
        self
    }

    pub fn absent_responses(mut self, absent: bool) -> Self {
        self.config.absent_responses = absent;
        self
    }

    /// Add fixture rows for one tenant's source file
    pub fn file(
        mut self,
        tenant_id: TenantId,
        source_file_name: impl Into<String>,
        rows: Vec<RawMetricRow>,
    ) -> Self {
        self.files.push((tenant_id, source_file_name.into(), rows));
        self
    }

    /// Build the data source, validating configuration and file names
    pub async fn build(self) -> Result<MockMetricDataSource> {
        let source = MockMetricDataSource::try_new(self.config).await?;
        for (tenant_id, name, rows) in self.files {
            validate_source_file_name(&name)?;
            source.set_file(tenant_id, name, rows).await;
        }
        Ok(source)
    }
}

impl Default for MockDataSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
