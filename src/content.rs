//! Tenant content documents
//!
//! Content is authored per tenant and decides which metrics are enabled,
//! what they are called, and how they are grouped for display.

use super::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Display groupings a metric can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollectionTypeId {
    Sentencing,
    Prison,
    Probation,
    Parole,
}

/// Membership info recorded on a metric for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub description: String,
}

impl Collection {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

pub type CollectionMap = BTreeMap<CollectionTypeId, Collection>;

/// Collection entry in a content document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub name: String,
    pub description: String,

    /// Metrics shown in this collection
    #[serde(default)]
    pub metrics: Vec<MetricTypeId>,
}

/// Metric entry in a content document
///
/// Only `name`, `description` and `methodology` feed a [`Metric`](crate::Metric);
/// display-only fields such as `mapCaption` are kept in `display`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMetadata {
    pub name: String,
    pub description: String,
    pub methodology: String,
    #[serde(flatten)]
    pub display: HashMap<String, serde_json::Value>,
}

impl MetricMetadata {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        methodology: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            methodology: methodology.into(),
            display: HashMap::new(),
        }
    }
}

/// Enabled metrics keyed by type; a missing key means "not enabled"
pub type MetricMetadataMapping = BTreeMap<MetricTypeId, MetricMetadata>;

/// Full content document for one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantContent {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub collections: BTreeMap<CollectionTypeId, CollectionMetadata>,
    #[serde(default)]
    pub metrics: MetricMetadataMapping,
}

impl TenantContent {
    /// Parse a content document from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let content: TenantContent = serde_json::from_str(json).map_err(from_serde_json_error)?;
        content.validate()?;
        Ok(content)
    }

    /// Check that every collection only lists enabled metrics
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(content_error("tenant", "Tenant name cannot be empty"));
        }

        for (collection_id, collection) in &self.collections {
            if let Some(missing) = collection
                .metrics
                .iter()
                .find(|id| !self.metrics.contains_key(*id))
            {
                return Err(content_error(
                    self.name.as_str(),
                    format!("collection {collection_id:?} lists {missing}, which has no metadata"),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTIAL_CONTENT: &str = include_str!("fixtures/tenant_content_partial.json");

    #[test]
    fn test_parse_partial_fixture() {
        let content = TenantContent::from_json(PARTIAL_CONTENT).unwrap();

        assert_eq!(content.name, "Test Tenant");
        assert_eq!(content.collections.len(), 2);
        assert_eq!(content.metrics.len(), 5);
        assert!(content
            .metrics
            .contains_key(&MetricTypeId::ParoleRevocationsAggregate));
        assert!(!content
            .metrics
            .contains_key(&MetricTypeId::ProbationPopulationCurrent));
    }

    #[test]
    fn test_display_fields_are_kept_aside() {
        let content = TenantContent::from_json(PARTIAL_CONTENT).unwrap();
        let metadata = &content.metrics[&MetricTypeId::PrisonPopulationCurrent];

        assert_eq!(metadata.name, "test PrisonPopulationCurrent name");
        assert_eq!(
            metadata.display["mapCaption"],
            "test PrisonPopulationCurrent map caption"
        );
        assert!(content.metrics[&MetricTypeId::PrisonPopulationHistorical]
            .display
            .is_empty());
    }

    #[test]
    fn test_unknown_metric_type_rejected() {
        let json = r#"{
            "name": "T",
            "description": "D",
            "metrics": {
                "PrisonPopulationFuture": {"name": "n", "description": "d", "methodology": "m"}
            }
        }"#;
        assert!(TenantContent::from_json(json).is_err());
    }

    #[test]
    fn test_collection_must_reference_enabled_metrics() {
        let json = r#"{
            "name": "T",
            "description": "D",
            "collections": {
                "Prison": {"name": "Prison", "description": "d", "metrics": ["PrisonPopulationCurrent"]}
            }
        }"#;
        let error = TenantContent::from_json(json).unwrap_err();
        assert!(error.to_string().contains("PrisonPopulationCurrent"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let json = r#"{"name": " ", "description": "D"}"#;
        assert!(TenantContent::from_json(json).is_err());
    }
}
