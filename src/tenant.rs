//! Tenant model
//!
//! A [`Tenant`] ties a content document to the metrics it enables, and
//! links every metric to the collections that display it.

use super::*;
use crate::content::{Collection, CollectionTypeId, TenantContent};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// One jurisdiction and its enabled metrics
#[derive(Debug)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub description: String,
    pub collections: BTreeMap<CollectionTypeId, Collection>,
    pub metrics: MetricMapping,
}

impl Tenant {
    /// Assemble a tenant from an already parsed content document
    ///
    /// Every metric listed by a collection gets that collection added to
    /// its `collections`. Listed metrics that are not enabled are skipped.
    pub fn from_content(
        tenant_id: TenantId,
        content: TenantContent,
        data_source: Arc<dyn MetricDataSource>,
    ) -> Self {
        let TenantContent {
            name,
            description,
            collections: collection_content,
            metrics: metadata_mapping,
        } = content;

        let mut metrics = create_metric_mapping(MetricMappingFactoryOptions {
            metadata_mapping,
            tenant_id,
            data_source,
        });

        let mut collections = BTreeMap::new();
        for (collection_id, metadata) in collection_content {
            let collection = Collection::new(metadata.name, metadata.description);

            for metric_id in metadata.metrics {
                if !metrics.add_collection(metric_id, collection_id, collection.clone()) {
                    warn!(
                        tenant = %tenant_id,
                        collection = ?collection_id,
                        metric_type = %metric_id,
                        "collection lists a metric that is not enabled"
                    );
                }
            }

            collections.insert(collection_id, collection);
        }

        info!(
            tenant = %tenant_id,
            metrics = metrics.len(),
            collections = collections.len(),
            "tenant assembled"
        );

        Self {
            id: tenant_id,
            name,
            description,
            collections,
            metrics,
        }
    }

    /// Parse and validate a content document, then assemble the tenant
    pub fn from_json(
        tenant_id: TenantId,
        json: &str,
        data_source: Arc<dyn MetricDataSource>,
    ) -> Result<Self> {
        let content = TenantContent::from_json(json)
            .map_err(|e| content_error(tenant_id.as_str(), e.to_string()))?;
        Ok(Self::from_content(tenant_id, content, data_source))
    }

    /// Metrics displayed in one collection, in enumeration order
    pub fn collection_metrics(&self, collection_id: CollectionTypeId) -> Vec<AnyMetric<'_>> {
        self.metrics
            .iter()
            .filter(|(_, metric)| metric.collections().contains_key(&collection_id))
            .map(|(_, metric)| metric)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CollectionMetadata;
    use crate::mock::MockMetricDataSource;

    const PARTIAL_CONTENT: &str = include_str!("fixtures/tenant_content_partial.json");

    fn source() -> Arc<dyn MetricDataSource> {
        Arc::new(MockMetricDataSource::default())
    }

    #[test]
    fn test_from_json_builds_metrics_and_collections() {
        let tenant = Tenant::from_json(TenantId::UsNd, PARTIAL_CONTENT, source()).unwrap();

        assert_eq!(tenant.id, TenantId::UsNd);
        assert_eq!(tenant.name, "Test Tenant");
        assert_eq!(tenant.metrics.len(), 5);
        assert_eq!(tenant.collections.len(), 2);
        for (_, metric) in tenant.metrics.iter() {
            assert_eq!(metric.tenant_id(), TenantId::UsNd);
        }
    }

    #[test]
    fn test_collection_membership_is_linked() {
        let tenant = Tenant::from_json(TenantId::UsNd, PARTIAL_CONTENT, source()).unwrap();

        let prison: Vec<_> = tenant
            .collection_metrics(CollectionTypeId::Prison)
            .iter()
            .map(|metric| metric.name().to_string())
            .collect();
        assert_eq!(
            prison,
            vec![
                "test PrisonPopulationCurrent name",
                "test PrisonPopulationHistorical name"
            ]
        );

        let sentence = tenant
            .metrics
            .get(MetricTypeId::SentencePopulationCurrent)
            .unwrap();
        assert!(sentence.collections().is_empty());
        assert!(tenant
            .collection_metrics(CollectionTypeId::Probation)
            .is_empty());
    }

    #[test]
    fn test_unlisted_collection_metric_is_skipped() {
        let mut content = TenantContent::from_json(PARTIAL_CONTENT).unwrap();
        content.collections.insert(
            CollectionTypeId::Probation,
            CollectionMetadata {
                name: "Probation".to_string(),
                description: "d".to_string(),
                metrics: vec![MetricTypeId::ProbationPopulationCurrent],
            },
        );

        let tenant = Tenant::from_content(TenantId::UsPa, content, source());

        assert!(tenant.collections.contains_key(&CollectionTypeId::Probation));
        assert!(!tenant
            .metrics
            .contains(MetricTypeId::ProbationPopulationCurrent));
        assert!(tenant
            .collection_metrics(CollectionTypeId::Probation)
            .is_empty());
    }

    #[test]
    fn test_invalid_content_reports_tenant() {
        let error = Tenant::from_json(TenantId::UsPa, "{not json", source()).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("Tenant content error for US_PA"));
        assert!(message.contains("JSON"));
        assert!(!message.contains("Tenant [US_PA]"));
    }
}
