//! Core domain types for metric models
//!
//! Identifiers, raw API payloads and the observable state snapshot shared
//! by every [`Metric`](crate::Metric).

use crate::{metric_validation_error, Result, TylError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// One untyped row of a metric file, keyed by column name
pub type RawMetricRow = HashMap<String, String>;

/// Raw API response: source file name to its rows
pub type RawMetricData = HashMap<String, Vec<RawMetricRow>>;

/// Pure function turning raw rows into typed records
///
/// Transformers must be total: any slice of rows, including an empty one,
/// produces a (possibly empty) record list.
pub type DataTransformer<R> = fn(&[RawMetricRow]) -> Vec<R>;

/// Organizational scope whose data a metric fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TenantId {
    #[serde(rename = "US_ND")]
    UsNd,
    #[serde(rename = "US_PA")]
    UsPa,
}

impl TenantId {
    /// All known tenants
    pub const ALL: [TenantId; 2] = [TenantId::UsNd, TenantId::UsPa];

    /// The tenant code used by the metrics API
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantId::UsNd => "US_ND",
            TenantId::UsPa => "US_PA",
        }
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantId {
    type Err = TylError;

    fn from_str(s: &str) -> Result<Self> {
        TenantId::ALL
            .into_iter()
            .find(|tenant| tenant.as_str() == s)
            .ok_or_else(|| metric_validation_error("tenant_id", format!("Unknown tenant: {s}")))
    }
}

/// Closed enumeration of every metric a tenant may enable
///
/// [`MetricTypeId::ALL`] fixes the iteration order used when building a
/// [`MetricMapping`](crate::MetricMapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricTypeId {
    SentencePopulationCurrent,
    SentenceTypesCurrent,
    PrisonPopulationCurrent,
    ProbationPopulationCurrent,
    ParolePopulationCurrent,
    PrisonPopulationHistorical,
    ProbationPopulationHistorical,
    ParolePopulationHistorical,
    ProbationProgrammingCurrent,
    ParoleProgrammingCurrent,
    ProbationSuccessHistorical,
    ParoleSuccessHistorical,
    ProbationSuccessAggregate,
    ParoleSuccessAggregate,
    ProbationRevocationsAggregate,
    ParoleRevocationsAggregate,
    PrisonAdmissionReasonsCurrent,
    PrisonReleaseTypeAggregate,
    PrisonRecidivismRateHistorical,
    PrisonRecidivismRateSingleFollowupHistorical,
    PrisonStayLengthAggregate,
}

impl MetricTypeId {
    pub const ALL: [MetricTypeId; 21] = [
        MetricTypeId::SentencePopulationCurrent,
        MetricTypeId::SentenceTypesCurrent,
        MetricTypeId::PrisonPopulationCurrent,
        MetricTypeId::ProbationPopulationCurrent,
        MetricTypeId::ParolePopulationCurrent,
        MetricTypeId::PrisonPopulationHistorical,
        MetricTypeId::ProbationPopulationHistorical,
        MetricTypeId::ParolePopulationHistorical,
        MetricTypeId::ProbationProgrammingCurrent,
        MetricTypeId::ParoleProgrammingCurrent,
        MetricTypeId::ProbationSuccessHistorical,
        MetricTypeId::ParoleSuccessHistorical,
        MetricTypeId::ProbationSuccessAggregate,
        MetricTypeId::ParoleSuccessAggregate,
        MetricTypeId::ProbationRevocationsAggregate,
        MetricTypeId::ParoleRevocationsAggregate,
        MetricTypeId::PrisonAdmissionReasonsCurrent,
        MetricTypeId::PrisonReleaseTypeAggregate,
        MetricTypeId::PrisonRecidivismRateHistorical,
        MetricTypeId::PrisonRecidivismRateSingleFollowupHistorical,
        MetricTypeId::PrisonStayLengthAggregate,
    ];

    /// The identifier as it appears in tenant content documents
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricTypeId::SentencePopulationCurrent => "SentencePopulationCurrent",
            MetricTypeId::SentenceTypesCurrent => "SentenceTypesCurrent",
            MetricTypeId::PrisonPopulationCurrent => "PrisonPopulationCurrent",
            MetricTypeId::ProbationPopulationCurrent => "ProbationPopulationCurrent",
            MetricTypeId::ParolePopulationCurrent => "ParolePopulationCurrent",
            MetricTypeId::PrisonPopulationHistorical => "PrisonPopulationHistorical",
            MetricTypeId::ProbationPopulationHistorical => "ProbationPopulationHistorical",
            MetricTypeId::ParolePopulationHistorical => "ParolePopulationHistorical",
            MetricTypeId::ProbationProgrammingCurrent => "ProbationProgrammingCurrent",
            MetricTypeId::ParoleProgrammingCurrent => "ParoleProgrammingCurrent",
            MetricTypeId::ProbationSuccessHistorical => "ProbationSuccessHistorical",
            MetricTypeId::ParoleSuccessHistorical => "ParoleSuccessHistorical",
            MetricTypeId::ProbationSuccessAggregate => "ProbationSuccessAggregate",
            MetricTypeId::ParoleSuccessAggregate => "ParoleSuccessAggregate",
            MetricTypeId::ProbationRevocationsAggregate => "ProbationRevocationsAggregate",
            MetricTypeId::ParoleRevocationsAggregate => "ParoleRevocationsAggregate",
            MetricTypeId::PrisonAdmissionReasonsCurrent => "PrisonAdmissionReasonsCurrent",
            MetricTypeId::PrisonReleaseTypeAggregate => "PrisonReleaseTypeAggregate",
            MetricTypeId::PrisonRecidivismRateHistorical => "PrisonRecidivismRateHistorical",
            MetricTypeId::PrisonRecidivismRateSingleFollowupHistorical => {
                "PrisonRecidivismRateSingleFollowupHistorical"
            }
            MetricTypeId::PrisonStayLengthAggregate => "PrisonStayLengthAggregate",
        }
    }
}

impl fmt::Display for MetricTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricTypeId {
    type Err = TylError;

    fn from_str(s: &str) -> Result<Self> {
        MetricTypeId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| metric_validation_error("metric_type", format!("Unknown metric: {s}")))
    }
}

/// Request sent to a [`MetricDataSource`](crate::MetricDataSource)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchMetricsRequest {
    /// Source file names to retrieve
    pub metric_names: Vec<String>,

    /// Tenant whose files are requested
    pub tenant_id: TenantId,
}

impl FetchMetricsRequest {
    pub fn new(tenant_id: TenantId, metric_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            metric_names: metric_names.into_iter().map(Into::into).collect(),
            tenant_id,
        }
    }
}

/// Point-in-time view of a metric's observable state
///
/// Published to subscribers on every mutation. `None` fields mean the
/// value was never set: `is_loading` stays `None` until the first fetch
/// begins and `records` until a fetch yields the metric's file.
#[derive(Debug)]
pub struct MetricState<R> {
    pub is_loading: Option<bool>,
    pub records: Option<Arc<Vec<R>>>,
    pub error: Option<Arc<TylError>>,
}

impl<R> MetricState<R> {
    /// True once a fetch has produced records
    pub fn has_records(&self) -> bool {
        self.records.is_some()
    }
}

impl<R> Default for MetricState<R> {
    fn default() -> Self {
        Self {
            is_loading: None,
            records: None,
            error: None,
        }
    }
}

// Manual impl: cloning shares the Arcs and must not require `R: Clone`.
impl<R> Clone for MetricState<R> {
    fn clone(&self) -> Self {
        Self {
            is_loading: self.is_loading,
            records: self.records.clone(),
            error: self.error.clone(),
        }
    }
}
