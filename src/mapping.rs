//! Metric mapping factory
//!
//! Turns a tenant's metric metadata into one typed [`Metric`] per enabled
//! metric type. Both the source file table and the transformer binding are
//! `match` expressions without a wildcard arm, so a new [`MetricTypeId`]
//! variant does not compile until it is bound.

use super::*;
use crate::content::{Collection, CollectionTypeId, MetricMetadata, MetricMetadataMapping};
use crate::records::*;
use crate::transforms;
use std::sync::Arc;
use tracing::debug;

impl MetricTypeId {
    /// Source file requested by metrics of this type
    ///
    /// Several types read the same file and differ only in their transformer.
    pub fn source_file_name(&self) -> &'static str {
        match self {
            MetricTypeId::SentencePopulationCurrent | MetricTypeId::SentenceTypesCurrent => {
                "sentence_type_by_district_by_demographics"
            }
            MetricTypeId::PrisonPopulationCurrent => {
                "incarceration_population_by_facility_by_demographics"
            }
            MetricTypeId::ProbationPopulationCurrent | MetricTypeId::ParolePopulationCurrent => {
                "supervision_population_by_district_by_demographics"
            }
            MetricTypeId::PrisonPopulationHistorical => {
                "incarceration_population_by_month_by_demographics"
            }
            MetricTypeId::ProbationPopulationHistorical
            | MetricTypeId::ParolePopulationHistorical => {
                "supervision_population_by_month_by_demographics"
            }
            MetricTypeId::ProbationProgrammingCurrent | MetricTypeId::ParoleProgrammingCurrent => {
                "active_program_participation_by_region"
            }
            MetricTypeId::ProbationSuccessHistorical | MetricTypeId::ParoleSuccessHistorical => {
                "supervision_success_by_month"
            }
            MetricTypeId::ProbationSuccessAggregate | MetricTypeId::ParoleSuccessAggregate => {
                "supervision_success_by_period_by_demographics"
            }
            MetricTypeId::ProbationRevocationsAggregate
            | MetricTypeId::ParoleRevocationsAggregate => {
                "supervision_revocations_by_period_by_type_by_demographics"
            }
            MetricTypeId::PrisonAdmissionReasonsCurrent => {
                "incarceration_population_by_admission_reason"
            }
            MetricTypeId::PrisonReleaseTypeAggregate => "incarceration_releases_by_type_by_period",
            MetricTypeId::PrisonRecidivismRateHistorical
            | MetricTypeId::PrisonRecidivismRateSingleFollowupHistorical => {
                "recidivism_rates_by_cohort_by_year"
            }
            MetricTypeId::PrisonStayLengthAggregate => "incarceration_lengths_by_demographics",
        }
    }
}

/// One optional, typed metric per metric type
///
/// `None` means the tenant has not enabled that metric.
#[derive(Debug, Default)]
pub struct MetricMapping {
    pub sentence_population_current: Option<Metric<PopulationBreakdownByLocationRecord>>,
    pub sentence_types_current: Option<Metric<SentenceTypeByLocationRecord>>,
    pub prison_population_current: Option<Metric<PopulationBreakdownByLocationRecord>>,
    pub probation_population_current: Option<Metric<PopulationBreakdownByLocationRecord>>,
    pub parole_population_current: Option<Metric<PopulationBreakdownByLocationRecord>>,
    pub prison_population_historical: Option<Metric<HistoricalPopulationBreakdownRecord>>,
    pub probation_population_historical: Option<Metric<HistoricalPopulationBreakdownRecord>>,
    pub parole_population_historical: Option<Metric<HistoricalPopulationBreakdownRecord>>,
    pub probation_programming_current: Option<Metric<ProgramParticipationCurrentRecord>>,
    pub parole_programming_current: Option<Metric<ProgramParticipationCurrentRecord>>,
    pub probation_success_historical: Option<Metric<SupervisionSuccessRateMonthlyRecord>>,
    pub parole_success_historical: Option<Metric<SupervisionSuccessRateMonthlyRecord>>,
    pub probation_success_aggregate: Option<Metric<SupervisionSuccessRateDemographicsRecord>>,
    pub parole_success_aggregate: Option<Metric<SupervisionSuccessRateDemographicsRecord>>,
    pub probation_revocations_aggregate: Option<Metric<DemographicsByCategoryRecord>>,
    pub parole_revocations_aggregate: Option<Metric<DemographicsByCategoryRecord>>,
    pub prison_admission_reasons_current: Option<Metric<DemographicsByCategoryRecord>>,
    pub prison_release_type_aggregate: Option<Metric<DemographicsByCategoryRecord>>,
    pub prison_recidivism_rate_historical: Option<Metric<RecidivismRateRecord>>,
    pub prison_recidivism_rate_single_followup_historical: Option<Metric<RecidivismRateRecord>>,
    pub prison_stay_length_aggregate: Option<Metric<DemographicsByCategoryRecord>>,
}

/// Apply `$body` to the field of `$mapping` selected by `$id`
///
/// `$access` is `as_ref` or `as_mut`. Every arm yields the same type, so
/// the body must erase the record type (e.g. through [`AnyMetric`]).
macro_rules! with_field {
    ($mapping:expr, $id:expr, $access:ident, |$metric:ident| $body:expr) => {
        match $id {
            MetricTypeId::SentencePopulationCurrent => {
                $mapping.sentence_population_current.$access().map(|$metric| $body)
            }
            MetricTypeId::SentenceTypesCurrent => {
                $mapping.sentence_types_current.$access().map(|$metric| $body)
            }
            MetricTypeId::PrisonPopulationCurrent => {
                $mapping.prison_population_current.$access().map(|$metric| $body)
            }
            MetricTypeId::ProbationPopulationCurrent => {
                $mapping.probation_population_current.$access().map(|$metric| $body)
            }
            MetricTypeId::ParolePopulationCurrent => {
                $mapping.parole_population_current.$access().map(|$metric| $body)
            }
            MetricTypeId::PrisonPopulationHistorical => {
                $mapping.prison_population_historical.$access().map(|$metric| $body)
            }
            MetricTypeId::ProbationPopulationHistorical => {
                $mapping.probation_population_historical.$access().map(|$metric| $body)
            }
            MetricTypeId::ParolePopulationHistorical => {
                $mapping.parole_population_historical.$access().map(|$metric| $body)
            }
            MetricTypeId::ProbationProgrammingCurrent => {
                $mapping.probation_programming_current.$access().map(|$metric| $body)
            }
            MetricTypeId::ParoleProgrammingCurrent => {
                $mapping.parole_programming_current.$access().map(|$metric| $body)
            }
            MetricTypeId::ProbationSuccessHistorical => {
                $mapping.probation_success_historical.$access().map(|$metric| $body)
            }
            MetricTypeId::ParoleSuccessHistorical => {
                $mapping.parole_success_historical.$access().map(|$metric| $body)
            }
            MetricTypeId::ProbationSuccessAggregate => {
                $mapping.probation_success_aggregate.$access().map(|$metric| $body)
            }
            MetricTypeId::ParoleSuccessAggregate => {
                $mapping.parole_success_aggregate.$access().map(|$metric| $body)
            }
            MetricTypeId::ProbationRevocationsAggregate => {
                $mapping.probation_revocations_aggregate.$access().map(|$metric| $body)
            }
            MetricTypeId::ParoleRevocationsAggregate => {
                $mapping.parole_revocations_aggregate.$access().map(|$metric| $body)
            }
            MetricTypeId::PrisonAdmissionReasonsCurrent => {
                $mapping.prison_admission_reasons_current.$access().map(|$metric| $body)
            }
            MetricTypeId::PrisonReleaseTypeAggregate => {
                $mapping.prison_release_type_aggregate.$access().map(|$metric| $body)
            }
            MetricTypeId::PrisonRecidivismRateHistorical => {
                $mapping.prison_recidivism_rate_historical.$access().map(|$metric| $body)
            }
            MetricTypeId::PrisonRecidivismRateSingleFollowupHistorical => $mapping
                .prison_recidivism_rate_single_followup_historical
                .$access()
                .map(|$metric| $body),
            MetricTypeId::PrisonStayLengthAggregate => {
                $mapping.prison_stay_length_aggregate.$access().map(|$metric| $body)
            }
        }
    };
}

impl MetricMapping {
    /// The metric enabled for `id`, if any
    pub fn get(&self, id: MetricTypeId) -> Option<AnyMetric<'_>> {
        with_field!(self, id, as_ref, |metric| AnyMetric::from(metric))
    }

    pub fn contains(&self, id: MetricTypeId) -> bool {
        self.get(id).is_some()
    }

    /// Enabled metric types, in enumeration order
    pub fn ids(&self) -> Vec<MetricTypeId> {
        MetricTypeId::ALL
            .into_iter()
            .filter(|id| self.contains(*id))
            .collect()
    }

    /// Enabled metrics, in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = (MetricTypeId, AnyMetric<'_>)> + '_ {
        MetricTypeId::ALL
            .into_iter()
            .filter_map(move |id| self.get(id).map(|metric| (id, metric)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record that the metric for `id` belongs to a collection
    ///
    /// Returns `false` when the metric is not enabled.
    pub fn add_collection(
        &mut self,
        id: MetricTypeId,
        collection_id: CollectionTypeId,
        collection: Collection,
    ) -> bool {
        with_field!(self, id, as_mut, |metric| metric
            .add_collection(collection_id, collection.clone()))
        .is_some()
    }
}

/// A metric of any record type, borrowed from a [`MetricMapping`]
#[derive(Debug, Clone, Copy)]
pub enum AnyMetric<'a> {
    PopulationBreakdownByLocation(&'a Metric<PopulationBreakdownByLocationRecord>),
    SentenceTypeByLocation(&'a Metric<SentenceTypeByLocationRecord>),
    HistoricalPopulationBreakdown(&'a Metric<HistoricalPopulationBreakdownRecord>),
    ProgramParticipationCurrent(&'a Metric<ProgramParticipationCurrentRecord>),
    SupervisionSuccessRateMonthly(&'a Metric<SupervisionSuccessRateMonthlyRecord>),
    SupervisionSuccessRateDemographics(&'a Metric<SupervisionSuccessRateDemographicsRecord>),
    DemographicsByCategory(&'a Metric<DemographicsByCategoryRecord>),
    RecidivismRate(&'a Metric<RecidivismRateRecord>),
}

macro_rules! any_metric_from {
    ($($variant:ident => $record:ty),+ $(,)?) => {
        $(
            impl<'a> From<&'a Metric<$record>> for AnyMetric<'a> {
                fn from(metric: &'a Metric<$record>) -> Self {
                    AnyMetric::$variant(metric)
                }
            }
        )+
    };
}

any_metric_from! {
    PopulationBreakdownByLocation => PopulationBreakdownByLocationRecord,
    SentenceTypeByLocation => SentenceTypeByLocationRecord,
    HistoricalPopulationBreakdown => HistoricalPopulationBreakdownRecord,
    ProgramParticipationCurrent => ProgramParticipationCurrentRecord,
    SupervisionSuccessRateMonthly => SupervisionSuccessRateMonthlyRecord,
    SupervisionSuccessRateDemographics => SupervisionSuccessRateDemographicsRecord,
    DemographicsByCategory => DemographicsByCategoryRecord,
    RecidivismRate => RecidivismRateRecord,
}

macro_rules! dispatch {
    ($any:expr, |$metric:ident| $body:expr) => {
        match $any {
            AnyMetric::PopulationBreakdownByLocation($metric) => $body,
            AnyMetric::SentenceTypeByLocation($metric) => $body,
            AnyMetric::HistoricalPopulationBreakdown($metric) => $body,
            AnyMetric::ProgramParticipationCurrent($metric) => $body,
            AnyMetric::SupervisionSuccessRateMonthly($metric) => $body,
            AnyMetric::SupervisionSuccessRateDemographics($metric) => $body,
            AnyMetric::DemographicsByCategory($metric) => $body,
            AnyMetric::RecidivismRate($metric) => $body,
        }
    };
}

impl<'a> AnyMetric<'a> {
    pub fn name(&self) -> &'a str {
        dispatch!(*self, |metric| metric.name())
    }

    pub fn description(&self) -> &'a str {
        dispatch!(*self, |metric| metric.description())
    }

    pub fn methodology(&self) -> &'a str {
        dispatch!(*self, |metric| metric.methodology())
    }

    pub fn tenant_id(&self) -> TenantId {
        dispatch!(*self, |metric| metric.tenant_id())
    }

    pub fn source_file_name(&self) -> &'a str {
        dispatch!(*self, |metric| metric.source_file_name())
    }

    pub fn collections(&self) -> &'a crate::content::CollectionMap {
        dispatch!(*self, |metric| metric.collections())
    }

    pub fn is_loading(&self) -> Option<bool> {
        dispatch!(*self, |metric| metric.is_loading())
    }

    pub fn error(&self) -> Option<Arc<TylError>> {
        dispatch!(*self, |metric| metric.error())
    }

    /// Number of loaded records, `None` until a fetch has produced them
    pub fn record_count(&self) -> Option<usize> {
        dispatch!(*self, |metric| metric.records().map(|records| records.len()))
    }

    pub async fn fetch(&self) -> Result<()> {
        dispatch!(*self, |metric| metric.fetch().await)
    }
}

/// Inputs of [`create_metric_mapping`]
#[derive(Clone)]
pub struct MetricMappingFactoryOptions {
    pub metadata_mapping: MetricMetadataMapping,
    pub tenant_id: TenantId,
    pub data_source: Arc<dyn MetricDataSource>,
}

fn bind<R>(
    metadata: &MetricMetadata,
    id: MetricTypeId,
    options: &MetricMappingFactoryOptions,
    data_transformer: DataTransformer<R>,
) -> Metric<R> {
    Metric::new(MetricInit {
        name: metadata.name.clone(),
        description: metadata.description.clone(),
        methodology: metadata.methodology.clone(),
        tenant_id: options.tenant_id,
        data_transformer,
        source_file_name: id.source_file_name().to_string(),
        data_source: Arc::clone(&options.data_source),
    })
}

/// Build one [`Metric`] per metric type present in the metadata mapping
///
/// Types without metadata are left out of the result. Metrics sharing a
/// source file are still independent instances with their own state.
///
/// ## Example
/// ```rust
/// use spotlight_metrics::{
///     create_metric_mapping, MetricMappingFactoryOptions, MetricMetadata, MetricMetadataMapping,
///     MetricTypeId, MockMetricDataSource, TenantId,
/// };
/// use std::sync::Arc;
///
/// let mut metadata_mapping = MetricMetadataMapping::new();
/// metadata_mapping.insert(
///     MetricTypeId::PrisonPopulationCurrent,
///     MetricMetadata::new("N", "D", "M"),
/// );
///
/// let mapping = create_metric_mapping(MetricMappingFactoryOptions {
///     metadata_mapping,
///     tenant_id: TenantId::UsNd,
///     data_source: Arc::new(MockMetricDataSource::default()),
/// });
///
/// assert_eq!(mapping.ids(), vec![MetricTypeId::PrisonPopulationCurrent]);
/// ```
pub fn create_metric_mapping(options: MetricMappingFactoryOptions) -> MetricMapping {
    let mut mapping = MetricMapping::default();

    for id in MetricTypeId::ALL {
        let Some(metadata) = options.metadata_mapping.get(&id) else {
            continue;
        };
        let o = &options;

        match id {
            MetricTypeId::SentencePopulationCurrent => {
                mapping.sentence_population_current =
                    Some(bind(metadata, id, o, transforms::sentence_population_current))
            }
            MetricTypeId::SentenceTypesCurrent => {
                mapping.sentence_types_current =
                    Some(bind(metadata, id, o, transforms::sentence_types_current))
            }
            MetricTypeId::PrisonPopulationCurrent => {
                mapping.prison_population_current =
                    Some(bind(metadata, id, o, transforms::prison_population_current))
            }
            MetricTypeId::ProbationPopulationCurrent => {
                mapping.probation_population_current =
                    Some(bind(metadata, id, o, transforms::probation_population_current))
            }
            MetricTypeId::ParolePopulationCurrent => {
                mapping.parole_population_current =
                    Some(bind(metadata, id, o, transforms::parole_population_current))
            }
            MetricTypeId::PrisonPopulationHistorical => {
                mapping.prison_population_historical =
                    Some(bind(metadata, id, o, transforms::prison_population_historical))
            }
            MetricTypeId::ProbationPopulationHistorical => {
                mapping.probation_population_historical =
                    Some(bind(metadata, id, o, transforms::probation_population_historical))
            }
            MetricTypeId::ParolePopulationHistorical => {
                mapping.parole_population_historical =
                    Some(bind(metadata, id, o, transforms::parole_population_historical))
            }
            MetricTypeId::ProbationProgrammingCurrent => {
                mapping.probation_programming_current = Some(bind(
                    metadata,
                    id,
                    o,
                    transforms::probation_program_participation_current,
                ))
            }
            MetricTypeId::ParoleProgrammingCurrent => {
                mapping.parole_programming_current = Some(bind(
                    metadata,
                    id,
                    o,
                    transforms::parole_program_participation_current,
                ))
            }
            MetricTypeId::ProbationSuccessHistorical => {
                mapping.probation_success_historical =
                    Some(bind(metadata, id, o, transforms::probation_success_rate_monthly))
            }
            MetricTypeId::ParoleSuccessHistorical => {
                mapping.parole_success_historical =
                    Some(bind(metadata, id, o, transforms::parole_success_rate_monthly))
            }
            MetricTypeId::ProbationSuccessAggregate => {
                mapping.probation_success_aggregate =
                    Some(bind(metadata, id, o, transforms::probation_success_rate_demographics))
            }
            MetricTypeId::ParoleSuccessAggregate => {
                mapping.parole_success_aggregate =
                    Some(bind(metadata, id, o, transforms::parole_success_rate_demographics))
            }
            MetricTypeId::ProbationRevocationsAggregate => {
                mapping.probation_revocations_aggregate =
                    Some(bind(metadata, id, o, transforms::probation_revocation_reasons))
            }
            MetricTypeId::ParoleRevocationsAggregate => {
                mapping.parole_revocations_aggregate =
                    Some(bind(metadata, id, o, transforms::parole_revocation_reasons))
            }
            MetricTypeId::PrisonAdmissionReasonsCurrent => {
                mapping.prison_admission_reasons_current =
                    Some(bind(metadata, id, o, transforms::prison_admission_reasons))
            }
            MetricTypeId::PrisonReleaseTypeAggregate => {
                mapping.prison_release_type_aggregate =
                    Some(bind(metadata, id, o, transforms::prison_release_types))
            }
            MetricTypeId::PrisonRecidivismRateHistorical => {
                mapping.prison_recidivism_rate_historical =
                    Some(bind(metadata, id, o, transforms::recidivism_rate_all_followup))
            }
            MetricTypeId::PrisonRecidivismRateSingleFollowupHistorical => {
                mapping.prison_recidivism_rate_single_followup_historical =
                    Some(bind(metadata, id, o, transforms::recidivism_rate_conventional_followup))
            }
            MetricTypeId::PrisonStayLengthAggregate => {
                mapping.prison_stay_length_aggregate =
                    Some(bind(metadata, id, o, transforms::prison_stay_lengths))
            }
        }

        debug!(
            metric_type = %id,
            tenant = %options.tenant_id,
            source_file = id.source_file_name(),
            "metric enabled"
        );
    }

    mapping
}
