//! Typed record shapes produced by the transformers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Value used by the metrics API for an unsplit demographic dimension
pub const TOTAL_KEY: &str = "ALL";

/// Demographic breakdown columns shared by most metric files
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicFields {
    pub race_or_ethnicity: String,
    pub gender: String,
    pub age_bucket: String,
}

impl DemographicFields {
    /// True when no demographic dimension is split out
    pub fn is_total(&self) -> bool {
        self.race_or_ethnicity == TOTAL_KEY && self.gender == TOTAL_KEY && self.age_bucket == TOTAL_KEY
    }
}

impl Default for DemographicFields {
    fn default() -> Self {
        Self {
            race_or_ethnicity: TOTAL_KEY.to_string(),
            gender: TOTAL_KEY.to_string(),
            age_bucket: TOTAL_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationBreakdownByLocationRecord {
    pub locality: String,
    pub population: u64,
    #[serde(flatten)]
    pub demographics: DemographicFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceTypeByLocationRecord {
    pub locality: String,
    pub dual_sentence: u64,
    pub incarceration: u64,
    pub probation: u64,
    #[serde(flatten)]
    pub demographics: DemographicFields,
}

/// Population on the first day of a calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPopulationBreakdownRecord {
    pub date: NaiveDate,
    pub population: u64,
    #[serde(flatten)]
    pub demographics: DemographicFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramParticipationCurrentRecord {
    pub locality: String,
    pub participant_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisionSuccessRateMonthlyRecord {
    pub year: i32,
    pub month: u32,
    pub rate_numerator: u64,
    pub rate_denominator: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisionSuccessRateDemographicsRecord {
    pub locality: String,
    pub rate_numerator: u64,
    pub rate_denominator: u64,
    pub rate: f64,
    #[serde(flatten)]
    pub demographics: DemographicFields,
}

/// One category count (admission reason, release type, stay length...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicsByCategoryRecord {
    pub category: String,
    pub count: u64,
    #[serde(flatten)]
    pub demographics: DemographicFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecidivismRateRecord {
    pub release_cohort: i32,
    pub followup_years: u32,
    pub recidivated_releases: u64,
    pub releases: u64,
    pub rate: f64,
    #[serde(flatten)]
    pub demographics: DemographicFields,
}
