//! # Spotlight Metrics
//!
//! **Hexagonal Architecture Port** for the public criminal-justice metrics
//! dashboard model.
//!
//! Each tenant (a jurisdiction) enables a subset of a fixed catalogue of
//! metrics. A metric fetches exactly one source file from the metrics API,
//! turns its raw rows into typed records, and exposes loading and error
//! state to the presentation layer.
//!
//! - **Port Interface**: [`MetricDataSource`] trait for the metrics API
//! - **Domain Model**: [`Metric`], [`MetricMapping`], [`Tenant`]
//! - **Transformers**: one pure function per metric in [`transforms`]
//! - **Mock Adapter**: [`MockMetricDataSource`] for tests and demos
//!
//! ## Quick Start
//!
//! ```rust
//! use spotlight_metrics::{
//!     create_metric_mapping, raw_row, MetricMappingFactoryOptions, MetricMetadata,
//!     MetricMetadataMapping, MetricTypeId, MockMetricDataSource, TenantId,
//! };
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let source = Arc::new(MockMetricDataSource::default());
//! source
//!     .set_file(
//!         TenantId::UsNd,
//!         "incarceration_population_by_facility_by_demographics",
//!         vec![raw_row([("facility", "NDSP"), ("total_population", "840")])],
//!     )
//!     .await;
//!
//! let mut metadata_mapping = MetricMetadataMapping::new();
//! metadata_mapping.insert(
//!     MetricTypeId::PrisonPopulationCurrent,
//!     MetricMetadata::new("Prison Population", "People in prison", "Daily snapshot"),
//! );
//!
//! let mapping = create_metric_mapping(MetricMappingFactoryOptions {
//!     metadata_mapping,
//!     tenant_id: TenantId::UsNd,
//!     data_source: source,
//! });
//!
//! let metric = mapping.prison_population_current.as_ref().unwrap();
//! metric.fetch().await.unwrap();
//! assert_eq!(metric.records().unwrap()[0].population, 840);
//! # });
//! ```

// Re-export TYL framework functionality
pub use tyl_config::{ConfigManager, ConfigPlugin};
pub use tyl_errors::{TylError, TylResult};
pub use tyl_logging::Environment;

// Core port interface
mod port;
pub use port::MetricDataSource;

// Domain types (port concern)
mod types;
pub use types::{
    DataTransformer, FetchMetricsRequest, MetricState, MetricTypeId, RawMetricData,
    RawMetricRow, TenantId,
};

mod records;
pub use records::{
    DemographicFields, DemographicsByCategoryRecord, HistoricalPopulationBreakdownRecord,
    PopulationBreakdownByLocationRecord, ProgramParticipationCurrentRecord, RecidivismRateRecord,
    SentenceTypeByLocationRecord, SupervisionSuccessRateDemographicsRecord,
    SupervisionSuccessRateMonthlyRecord, TOTAL_KEY,
};

pub mod transforms;

mod metric;
pub use metric::{Metric, MetricInit};

mod mapping;
pub use mapping::{create_metric_mapping, AnyMetric, MetricMapping, MetricMappingFactoryOptions};

mod content;
pub use content::{
    Collection, CollectionMap, CollectionMetadata, CollectionTypeId, MetricMetadata,
    MetricMetadataMapping, TenantContent,
};

mod tenant;
pub use tenant::Tenant;

// Error helpers for the metrics domain
mod errors;
pub use errors::{
    content_error, from_serde_json_error, metric_config_error, metric_data_unavailable_error,
    metric_fetch_cancelled_error, metric_fetch_error, metric_source_error,
    metric_validation_error, MetricErrorExt,
};

// Validation and raw-row helpers
mod utils;
pub use utils::{
    demographic_fields, field, parse_count, parse_int, rate, raw_row, validate_fetch_request,
    validate_source_file_name,
};

// Mock adapter for tests and demos
mod mock;
pub use mock::{MockDataSourceBuilder, MockDataSourceConfig, MockMetricDataSource};

/// Result type for metric operations using TYL error handling
pub type Result<T> = TylResult<T>;

/// Re-export async_trait for adapter implementations
pub use async_trait::async_trait;
