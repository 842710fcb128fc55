//! The `Metric` entity
//!
//! A `Metric` wraps exactly one source file for exactly one tenant. It owns
//! the fetch lifecycle and the typed records produced by its transformer,
//! and publishes every state change through a `watch` channel.

use super::*;
use crate::content::{Collection, CollectionMap, CollectionTypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Construction options for a [`Metric`]
pub struct MetricInit<R> {
    pub name: String,
    pub description: String,
    pub methodology: String,
    pub tenant_id: TenantId,
    pub data_transformer: DataTransformer<R>,
    pub source_file_name: String,
    pub data_source: Arc<dyn MetricDataSource>,
}

/// A single dataset backed by the metrics API
///
/// The recommended way to build metrics is
/// [`create_metric_mapping`](crate::create_metric_mapping), which binds each
/// metric type to its transformer and source file.
///
/// ## Fetch outcomes
/// - file present: records replaced with the transformed rows
/// - file missing from the response: records untouched, not an error
/// - no response, or a transport failure: `error` recorded and returned
///
/// `is_loading` is `Some(false)` after every outcome.
///
/// ## Overlapping fetches
/// A `fetch()` that starts while another is in flight waits for it and
/// reuses its outcome rather than sending a second request.
pub struct Metric<R> {
    name: String,
    description: String,
    methodology: String,
    tenant_id: TenantId,
    source_file_name: String,
    data_transformer: DataTransformer<R>,
    data_source: Arc<dyn MetricDataSource>,
    collections: CollectionMap,
    state: watch::Sender<MetricState<R>>,
    in_flight: Mutex<()>,
    completed_fetches: AtomicU64,
}

impl<R> Metric<R> {
    /// Create a metric; no I/O happens until [`Metric::fetch`]
    pub fn new(init: MetricInit<R>) -> Self {
        let (state, _) = watch::channel(MetricState::default());

        Self {
            name: init.name,
            description: init.description,
            methodology: init.methodology,
            tenant_id: init.tenant_id,
            source_file_name: init.source_file_name,
            data_transformer: init.data_transformer,
            data_source: init.data_source,
            collections: CollectionMap::new(),
            state,
            in_flight: Mutex::new(()),
            completed_fetches: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn methodology(&self) -> &str {
        &self.methodology
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn source_file_name(&self) -> &str {
        &self.source_file_name
    }

    /// Display groupings this metric belongs to
    pub fn collections(&self) -> &CollectionMap {
        &self.collections
    }

    /// Record membership in a display grouping
    pub fn add_collection(&mut self, id: CollectionTypeId, collection: Collection) {
        self.collections.insert(id, collection);
    }

    /// Typed records, or `None` until a fetch has produced them
    pub fn records(&self) -> Option<Arc<Vec<R>>> {
        self.state.borrow().records.clone()
    }

    /// `None` until the first fetch begins
    pub fn is_loading(&self) -> Option<bool> {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<Arc<TylError>> {
        self.state.borrow().error.clone()
    }

    /// Snapshot of the whole observable state
    pub fn state(&self) -> MetricState<R> {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    ///
    /// The receiver sees the current state immediately and is notified on
    /// every mutation made by [`Metric::fetch`].
    pub fn subscribe(&self) -> watch::Receiver<MetricState<R>> {
        self.state.subscribe()
    }

    /// Fetch the source file and replace the records with its transform
    ///
    /// Sets `is_loading` before the first suspension point. Returns once
    /// the state reflects the outcome; read [`Metric::records`] afterwards.
    ///
    /// Dropping the returned future never leaves `is_loading` stuck: a
    /// request abandoned mid-flight is recorded as a cancellation error.
    pub async fn fetch(&self) -> Result<()> {
        let completed_at_entry = self.completed_fetches.load(Ordering::Acquire);
        self.state.send_modify(|state| state.is_loading = Some(true));
        let mut pending = PendingFetch::new(self);

        let _guard = self.in_flight.lock().await;
        if self.completed_fetches.load(Ordering::Acquire) != completed_at_entry {
            debug!(
                metric = %self.name,
                tenant = %self.tenant_id,
                "joined in-flight fetch"
            );
            // Holding the lock means nothing is in flight.
            self.state.send_modify(|state| state.is_loading = Some(false));
            pending.disarm();
            return self.outcome();
        }

        // A joined caller may have cleared the flag while this one waited.
        self.state.send_modify(|state| state.is_loading = Some(true));
        pending.request_started = true;

        let request_id = Uuid::new_v4();
        let request = FetchMetricsRequest::new(self.tenant_id, [self.source_file_name.as_str()]);
        debug!(
            metric = %self.name,
            tenant = %self.tenant_id,
            source_file = %self.source_file_name,
            %request_id,
            data_source = self.data_source.source_name(),
            "fetching metric data"
        );

        let response = self.data_source.fetch_metrics(&request).await;
        self.apply_response(response, request_id);
        self.completed_fetches.fetch_add(1, Ordering::AcqRel);
        pending.disarm();

        self.outcome()
    }

    fn apply_response(&self, response: Result<Option<RawMetricData>>, request_id: Uuid) {
        match response {
            Ok(Some(mut data)) => match data.remove(&self.source_file_name) {
                Some(rows) => {
                    let records = (self.data_transformer)(&rows);
                    info!(
                        metric = %self.name,
                        tenant = %self.tenant_id,
                        %request_id,
                        rows = rows.len(),
                        records = records.len(),
                        "metric data loaded"
                    );
                    self.state.send_modify(|state| {
                        state.records = Some(Arc::new(records));
                        state.error = None;
                        state.is_loading = Some(false);
                    });
                }
                None => {
                    warn!(
                        metric = %self.name,
                        tenant = %self.tenant_id,
                        source_file = %self.source_file_name,
                        %request_id,
                        "response did not include source file"
                    );
                    self.state.send_modify(|state| {
                        state.error = None;
                        state.is_loading = Some(false);
                    });
                }
            },
            Ok(None) => {
                warn!(
                    metric = %self.name,
                    tenant = %self.tenant_id,
                    source_file = %self.source_file_name,
                    %request_id,
                    "data source returned no response"
                );
                self.record_error(metric_data_unavailable_error(
                    self.source_file_name.as_str(),
                    self.tenant_id.as_str(),
                ));
            }
            Err(error) => {
                warn!(
                    metric = %self.name,
                    tenant = %self.tenant_id,
                    %request_id,
                    error = %error,
                    "metric fetch failed"
                );
                self.record_error(error);
            }
        }
    }

    fn record_error(&self, error: TylError) {
        self.state.send_modify(|state| {
            state.error = Some(Arc::new(error));
            state.is_loading = Some(false);
        });
    }

    fn outcome(&self) -> Result<()> {
        match self.state.borrow().error.as_ref() {
            Some(error) => Err(metric_fetch_error(self.name.as_str(), error.to_string())),
            None => Ok(()),
        }
    }
}

/// Settles the observable state when a `fetch()` future is dropped early
struct PendingFetch<'a, R> {
    metric: &'a Metric<R>,
    request_started: bool,
    armed: bool,
}

impl<'a, R> PendingFetch<'a, R> {
    fn new(metric: &'a Metric<R>) -> Self {
        Self {
            metric,
            request_started: false,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<R> Drop for PendingFetch<'_, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let metric = self.metric;
        if self.request_started {
            warn!(
                metric = %metric.name,
                tenant = %metric.tenant_id,
                source_file = %metric.source_file_name,
                "metric fetch dropped before completion"
            );
            metric.record_error(metric_fetch_cancelled_error(metric.name.as_str()));
            return;
        }

        // Dropped while waiting: whoever holds the lock settles the state.
        if let Ok(_guard) = metric.in_flight.try_lock() {
            metric
                .state
                .send_modify(|state| state.is_loading = Some(false));
        }
    }
}

impl<R> fmt::Debug for Metric<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("tenant_id", &self.tenant_id)
            .field("source_file_name", &self.source_file_name)
            .field("is_loading", &state.is_loading)
            .field("records", &state.records.as_ref().map(|r| r.len()))
            .field("has_error", &state.error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDataSourceConfig, MockMetricDataSource};
    use crate::records::PopulationBreakdownByLocationRecord;
    use crate::transforms;
    use std::time::Duration;

    const FACILITY_FILE: &str = "incarceration_population_by_facility_by_demographics";

    fn facility_rows() -> Vec<RawMetricRow> {
        vec![
            raw_row([("facility", "NDSP"), ("total_population", "840")]),
            raw_row([("facility", "JRCC"), ("total_population", "410")]),
        ]
    }

    fn prison_metric(source: Arc<MockMetricDataSource>) -> Metric<PopulationBreakdownByLocationRecord> {
        Metric::new(MetricInit {
            name: "Prison Population".to_string(),
            description: "People in prison today".to_string(),
            methodology: "Daily snapshot".to_string(),
            tenant_id: TenantId::UsNd,
            data_transformer: transforms::prison_population_current,
            source_file_name: FACILITY_FILE.to_string(),
            data_source: source,
        })
    }

    async fn source_with_facilities(config: MockDataSourceConfig) -> Arc<MockMetricDataSource> {
        let source = MockMetricDataSource::new(config);
        source
            .set_file(TenantId::UsNd, FACILITY_FILE, facility_rows())
            .await;
        Arc::new(source)
    }

    #[test]
    fn test_new_metric_state_is_unset() {
        let metric = prison_metric(Arc::new(MockMetricDataSource::default()));

        assert_eq!(metric.name(), "Prison Population");
        assert_eq!(metric.description(), "People in prison today");
        assert_eq!(metric.methodology(), "Daily snapshot");
        assert_eq!(metric.tenant_id(), TenantId::UsNd);
        assert_eq!(metric.source_file_name(), FACILITY_FILE);
        assert!(metric.records().is_none());
        assert_eq!(metric.is_loading(), None);
        assert!(metric.error().is_none());
        assert!(metric.collections().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_transforms_rows() {
        let source = source_with_facilities(MockDataSourceConfig::default()).await;
        let metric = prison_metric(source.clone());

        metric.fetch().await.unwrap();

        let expected = transforms::prison_population_current(&facility_rows());
        assert_eq!(metric.records().as_deref(), Some(&expected));
        assert_eq!(metric.is_loading(), Some(false));
        assert!(metric.error().is_none());

        let requests = source.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tenant_id, TenantId::UsNd);
        assert_eq!(requests[0].metric_names, vec![FACILITY_FILE.to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_sets_loading_before_suspending() {
        let config = MockDataSourceConfig::default().with_latency(Duration::from_millis(50));
        let source = source_with_facilities(config).await;
        let metric = prison_metric(source);

        let fetch = metric.fetch();
        tokio::pin!(fetch);
        assert!(tokio::time::timeout(Duration::from_millis(1), &mut fetch)
            .await
            .is_err());
        assert_eq!(metric.is_loading(), Some(true));
        assert!(metric.records().is_none());

        fetch.await.unwrap();
        assert_eq!(metric.is_loading(), Some(false));
        assert!(metric.records().is_some());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_an_error() {
        let source = Arc::new(MockMetricDataSource::default());
        let metric = prison_metric(source);

        metric.fetch().await.unwrap();

        assert!(metric.records().is_none());
        assert_eq!(metric.is_loading(), Some(false));
        assert!(metric.error().is_none());
    }

    #[tokio::test]
    async fn test_absent_response_records_error_and_stops_loading() {
        let config = MockDataSourceConfig::default().with_absent_responses(true);
        let source = source_with_facilities(config).await;
        let metric = prison_metric(source);

        let result = metric.fetch().await;

        assert!(result.is_err());
        assert_eq!(metric.is_loading(), Some(false));
        assert!(metric.records().is_none());
        let error = metric.error().expect("absent response should record an error");
        assert!(error.to_string().contains(FACILITY_FILE));
    }

    #[tokio::test]
    async fn test_transport_failure_records_error() {
        let config = MockDataSourceConfig::default().with_failures(1.0);
        let source = source_with_facilities(config).await;
        let metric = prison_metric(source);

        let result = metric.fetch().await;

        let message = result.unwrap_err().to_string();
        assert!(message.contains("Prison Population"));
        assert!(message.contains("Simulated transport failure"));
        assert_eq!(metric.is_loading(), Some(false));
        assert!(metric.error().is_some());
    }

    #[tokio::test]
    async fn test_successful_fetch_clears_previous_error() {
        let config = MockDataSourceConfig::default().with_absent_responses(true);
        let source = source_with_facilities(config).await;
        let metric = prison_metric(source.clone());
        assert!(metric.fetch().await.is_err());
        assert!(metric.error().is_some());

        source.set_absent_responses(false).await;
        metric.fetch().await.unwrap();

        assert!(metric.error().is_none());
        assert_eq!(metric.records().map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_add_collection() {
        let mut metric = prison_metric(Arc::new(MockMetricDataSource::default()));
        metric.add_collection(
            CollectionTypeId::Prison,
            Collection::new("Prison", "Facilities"),
        );

        let collection = &metric.collections()[&CollectionTypeId::Prison];
        assert_eq!(collection.name, "Prison");
    }

    #[tokio::test]
    async fn test_sequential_fetches_are_idempotent() {
        let source = source_with_facilities(MockDataSourceConfig::default()).await;
        let metric = prison_metric(source.clone());

        metric.fetch().await.unwrap();
        let first = metric.records().unwrap();
        metric.fetch().await.unwrap();
        let second = metric.records().unwrap();

        assert_eq!(*first, *second);
        assert_eq!(source.request_count().await, 2);
    }

    #[tokio::test]
    async fn test_overlapping_fetches_share_one_request() {
        let config = MockDataSourceConfig::default().with_latency(Duration::from_millis(20));
        let source = source_with_facilities(config).await;
        let metric = prison_metric(source.clone());

        let (first, second) = tokio::join!(metric.fetch(), metric.fetch());

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(source.request_count().await, 1);
        assert_eq!(metric.records().map(|r| r.len()), Some(2));
        assert_eq!(metric.is_loading(), Some(false));
    }

    #[tokio::test]
    async fn test_overlapping_fetches_share_failure() {
        let config = MockDataSourceConfig::default()
            .with_latency(Duration::from_millis(20))
            .with_absent_responses(true);
        let source = source_with_facilities(config).await;
        let metric = prison_metric(source.clone());

        let (first, second) = tokio::join!(metric.fetch(), metric.fetch());

        assert!(first.is_err());
        assert!(second.is_err());
        assert_eq!(source.request_count().await, 1);
    }

    #[test]
    fn test_fetch_from_many_threads_settles_loading() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let source = runtime.block_on(source_with_facilities(MockDataSourceConfig::default()));
        let metric = Arc::new(prison_metric(source));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metric = Arc::clone(&metric);
                std::thread::spawn(move || {
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .unwrap();
                    runtime.block_on(async {
                        for _ in 0..50 {
                            metric.fetch().await.unwrap();
                        }
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metric.is_loading(), Some(false));
        assert!(metric.error().is_none());
        assert_eq!(metric.records().map(|r| r.len()), Some(2));
    }

    #[tokio::test]
    async fn test_dropped_fetch_records_cancellation() {
        let config = MockDataSourceConfig::default().with_latency(Duration::from_millis(50));
        let source = source_with_facilities(config).await;
        let metric = prison_metric(source);

        let timed_out = tokio::time::timeout(Duration::from_millis(1), metric.fetch()).await;

        assert!(timed_out.is_err());
        assert_eq!(metric.is_loading(), Some(false));
        assert!(metric.records().is_none());
        let error = metric.error().expect("dropped fetch should record an error");
        assert!(error.to_string().contains("cancelled"));

        metric.fetch().await.unwrap();
        assert!(metric.error().is_none());
        assert_eq!(metric.records().map(|r| r.len()), Some(2));
    }

    #[tokio::test]
    async fn test_dropped_waiter_leaves_in_flight_fetch_alone() {
        let config = MockDataSourceConfig::default().with_latency(Duration::from_millis(50));
        let source = source_with_facilities(config).await;
        let metric = prison_metric(source.clone());

        let (first, waiter) = tokio::join!(metric.fetch(), async {
            let timed_out = tokio::time::timeout(Duration::from_millis(1), metric.fetch()).await;
            (timed_out.is_err(), metric.is_loading())
        });

        first.unwrap();
        assert_eq!(waiter, (true, Some(true)));
        assert_eq!(metric.is_loading(), Some(false));
        assert!(metric.error().is_none());
        assert_eq!(source.request_count().await, 1);
    }

    #[tokio::test]
    async fn test_subscribers_observe_completion() {
        let source = source_with_facilities(MockDataSourceConfig::default()).await;
        let metric = prison_metric(source);
        let mut receiver = metric.subscribe();
        assert_eq!(receiver.borrow_and_update().is_loading, None);

        metric.fetch().await.unwrap();

        assert!(receiver.has_changed().unwrap());
        let state = receiver.borrow_and_update().clone();
        assert_eq!(state.is_loading, Some(false));
        assert_eq!(state.records.map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_debug_output() {
        let metric = prison_metric(Arc::new(MockMetricDataSource::default()));
        let debug = format!("{metric:?}");
        assert!(debug.contains("Prison Population"));
        assert!(debug.contains("UsNd"));
    }
}
