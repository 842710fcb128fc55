//! Data transformers, one per metric
//!
//! Every function here is a [`DataTransformer`](crate::DataTransformer):
//! pure, deterministic and total over any slice of raw rows. Columns that
//! are missing or unparseable read as zero (see [`parse_count`]), and rows
//! that cannot describe a calendar month are dropped.

use crate::records::*;
use crate::utils::{demographic_fields, field, parse_count, parse_int, rate};
use crate::RawMetricRow;
use chrono::NaiveDate;

/// Aggregate windows in the API are reported per period; dashboards show 36 months.
const AGGREGATE_PERIOD_MONTHS: &str = "36";

/// Followup windows shown by the single-followup recidivism chart
const CONVENTIONAL_FOLLOWUP_YEARS: [u32; 3] = [1, 3, 5];

#[derive(Clone, Copy)]
enum SupervisionType {
    Probation,
    Parole,
}

impl SupervisionType {
    fn as_str(self) -> &'static str {
        match self {
            SupervisionType::Probation => "PROBATION",
            SupervisionType::Parole => "PAROLE",
        }
    }
}

fn supervision_rows(
    rows: &[RawMetricRow],
    supervision_type: SupervisionType,
) -> impl Iterator<Item = &RawMetricRow> {
    rows.iter()
        .filter(move |row| field(row, "supervision_type") == supervision_type.as_str())
}

fn is_aggregate_period(row: &RawMetricRow) -> bool {
    field(row, "metric_period_months") == AGGREGATE_PERIOD_MONTHS
}

fn month_start(row: &RawMetricRow) -> Option<NaiveDate> {
    let year = i32::try_from(parse_int(row, "year")).ok()?;
    let month = u32::try_from(parse_int(row, "month")).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Expand one row into a record per `(category, column)` pair
fn category_records<'a>(
    row: &'a RawMetricRow,
    categories: &'a [(&'a str, &'a str)],
) -> impl Iterator<Item = DemographicsByCategoryRecord> + 'a {
    let demographics = demographic_fields(row);
    categories
        .iter()
        .map(move |(category, column)| DemographicsByCategoryRecord {
            category: category.to_string(),
            count: parse_count(row, column),
            demographics: demographics.clone(),
        })
}

fn population_by_location<'a>(
    rows: impl Iterator<Item = &'a RawMetricRow>,
    locality_column: &str,
    population_column: &str,
) -> Vec<PopulationBreakdownByLocationRecord> {
    rows.map(|row| PopulationBreakdownByLocationRecord {
        locality: field(row, locality_column).to_string(),
        population: parse_count(row, population_column),
        demographics: demographic_fields(row),
    })
    .collect()
}

fn historical_population<'a>(
    rows: impl Iterator<Item = &'a RawMetricRow>,
    population_column: &str,
) -> Vec<HistoricalPopulationBreakdownRecord> {
    rows.filter_map(|row| {
        Some(HistoricalPopulationBreakdownRecord {
            date: month_start(row)?,
            population: parse_count(row, population_column),
            demographics: demographic_fields(row),
        })
    })
    .collect()
}

pub fn sentence_population_current(rows: &[RawMetricRow]) -> Vec<PopulationBreakdownByLocationRecord> {
    population_by_location(rows.iter(), "district", "total_population")
}

pub fn sentence_types_current(rows: &[RawMetricRow]) -> Vec<SentenceTypeByLocationRecord> {
    rows.iter()
        .map(|row| SentenceTypeByLocationRecord {
            locality: field(row, "district").to_string(),
            dual_sentence: parse_count(row, "dual_sentence_count"),
            incarceration: parse_count(row, "incarceration_count"),
            probation: parse_count(row, "probation_count"),
            demographics: demographic_fields(row),
        })
        .collect()
}

pub fn prison_population_current(rows: &[RawMetricRow]) -> Vec<PopulationBreakdownByLocationRecord> {
    population_by_location(rows.iter(), "facility", "total_population")
}

pub fn probation_population_current(
    rows: &[RawMetricRow],
) -> Vec<PopulationBreakdownByLocationRecord> {
    population_by_location(
        supervision_rows(rows, SupervisionType::Probation),
        "district",
        "total_supervision_count",
    )
}

pub fn parole_population_current(rows: &[RawMetricRow]) -> Vec<PopulationBreakdownByLocationRecord> {
    population_by_location(
        supervision_rows(rows, SupervisionType::Parole),
        "district",
        "total_supervision_count",
    )
}

pub fn prison_population_historical(
    rows: &[RawMetricRow],
) -> Vec<HistoricalPopulationBreakdownRecord> {
    historical_population(rows.iter(), "total_population")
}

pub fn probation_population_historical(
    rows: &[RawMetricRow],
) -> Vec<HistoricalPopulationBreakdownRecord> {
    historical_population(
        supervision_rows(rows, SupervisionType::Probation),
        "total_supervision_count",
    )
}

pub fn parole_population_historical(
    rows: &[RawMetricRow],
) -> Vec<HistoricalPopulationBreakdownRecord> {
    historical_population(
        supervision_rows(rows, SupervisionType::Parole),
        "total_supervision_count",
    )
}

fn program_participation(
    rows: &[RawMetricRow],
    supervision_type: SupervisionType,
) -> Vec<ProgramParticipationCurrentRecord> {
    supervision_rows(rows, supervision_type)
        .map(|row| ProgramParticipationCurrentRecord {
            locality: field(row, "region_id").to_string(),
            participant_count: parse_count(row, "participation_count"),
        })
        .collect()
}

pub fn probation_program_participation_current(
    rows: &[RawMetricRow],
) -> Vec<ProgramParticipationCurrentRecord> {
    program_participation(rows, SupervisionType::Probation)
}

pub fn parole_program_participation_current(
    rows: &[RawMetricRow],
) -> Vec<ProgramParticipationCurrentRecord> {
    program_participation(rows, SupervisionType::Parole)
}

fn success_rate_monthly(
    rows: &[RawMetricRow],
    supervision_type: SupervisionType,
) -> Vec<SupervisionSuccessRateMonthlyRecord> {
    supervision_rows(rows, supervision_type)
        .filter_map(|row| {
            let date = month_start(row)?;
            let rate_numerator = parse_count(row, "successful_termination_count");
            let rate_denominator = parse_count(row, "projected_completion_count");
            Some(SupervisionSuccessRateMonthlyRecord {
                year: chrono::Datelike::year(&date),
                month: chrono::Datelike::month(&date),
                rate_numerator,
                rate_denominator,
                rate: rate(rate_numerator, rate_denominator),
            })
        })
        .collect()
}

pub fn probation_success_rate_monthly(
    rows: &[RawMetricRow],
) -> Vec<SupervisionSuccessRateMonthlyRecord> {
    success_rate_monthly(rows, SupervisionType::Probation)
}

pub fn parole_success_rate_monthly(rows: &[RawMetricRow]) -> Vec<SupervisionSuccessRateMonthlyRecord> {
    success_rate_monthly(rows, SupervisionType::Parole)
}

fn success_rate_demographics(
    rows: &[RawMetricRow],
    supervision_type: SupervisionType,
) -> Vec<SupervisionSuccessRateDemographicsRecord> {
    supervision_rows(rows, supervision_type)
        .filter(|row| is_aggregate_period(row))
        .map(|row| {
            let rate_numerator = parse_count(row, "successful_termination_count");
            let rate_denominator = parse_count(row, "projected_completion_count");
            SupervisionSuccessRateDemographicsRecord {
                locality: field(row, "district").to_string(),
                rate_numerator,
                rate_denominator,
                rate: rate(rate_numerator, rate_denominator),
                demographics: demographic_fields(row),
            }
        })
        .collect()
}

pub fn probation_success_rate_demographics(
    rows: &[RawMetricRow],
) -> Vec<SupervisionSuccessRateDemographicsRecord> {
    success_rate_demographics(rows, SupervisionType::Probation)
}

pub fn parole_success_rate_demographics(
    rows: &[RawMetricRow],
) -> Vec<SupervisionSuccessRateDemographicsRecord> {
    success_rate_demographics(rows, SupervisionType::Parole)
}

const REVOCATION_CATEGORIES: [(&str, &str); 4] = [
    ("ABSCONDED", "absconsion_count"),
    ("NEW_CRIME", "new_crime_count"),
    ("TECHNICAL", "technical_count"),
    ("UNKNOWN_REVOCATION", "unknown_count"),
];

fn revocation_reasons(
    rows: &[RawMetricRow],
    supervision_type: SupervisionType,
) -> Vec<DemographicsByCategoryRecord> {
    supervision_rows(rows, supervision_type)
        .filter(|row| is_aggregate_period(row))
        .filter(|row| matches!(field(row, "district"), "" | TOTAL_KEY))
        .flat_map(|row| category_records(row, &REVOCATION_CATEGORIES))
        .collect()
}

pub fn probation_revocation_reasons(rows: &[RawMetricRow]) -> Vec<DemographicsByCategoryRecord> {
    revocation_reasons(rows, SupervisionType::Probation)
}

pub fn parole_revocation_reasons(rows: &[RawMetricRow]) -> Vec<DemographicsByCategoryRecord> {
    revocation_reasons(rows, SupervisionType::Parole)
}

const ADMISSION_CATEGORIES: [(&str, &str); 4] = [
    ("NEW_ADMISSION", "new_admissions"),
    ("PAROLE_REVOCATION", "parole_revocations"),
    ("PROBATION_REVOCATION", "probation_revocations"),
    ("OTHER", "other"),
];

pub fn prison_admission_reasons(rows: &[RawMetricRow]) -> Vec<DemographicsByCategoryRecord> {
    rows.iter()
        .flat_map(|row| category_records(row, &ADMISSION_CATEGORIES))
        .collect()
}

const RELEASE_CATEGORIES: [(&str, &str); 5] = [
    ("EXTERNAL_TRANSFER", "external_transfer_count"),
    ("SENTENCE_COMPLETION", "sentence_completion_count"),
    ("PAROLE", "parole_count"),
    ("PROBATION", "probation_count"),
    ("DEATH", "death_count"),
];

pub fn prison_release_types(rows: &[RawMetricRow]) -> Vec<DemographicsByCategoryRecord> {
    rows.iter()
        .filter(|row| is_aggregate_period(row))
        .flat_map(|row| category_records(row, &RELEASE_CATEGORIES))
        .collect()
}

const STAY_LENGTH_CATEGORIES: [(&str, &str); 7] = [
    ("<1", "years_0_1"),
    ("1-2", "years_1_2"),
    ("2-3", "years_2_3"),
    ("3-5", "years_3_5"),
    ("5-10", "years_5_10"),
    ("10-20", "years_10_20"),
    ("20+", "years_20_plus"),
];

pub fn prison_stay_lengths(rows: &[RawMetricRow]) -> Vec<DemographicsByCategoryRecord> {
    rows.iter()
        .filter(|row| is_aggregate_period(row))
        .flat_map(|row| category_records(row, &STAY_LENGTH_CATEGORIES))
        .collect()
}

fn recidivism_rate(row: &RawMetricRow) -> Option<RecidivismRateRecord> {
    let release_cohort = i32::try_from(parse_int(row, "release_cohort")).ok()?;
    let followup_years = u32::try_from(parse_int(row, "followup_years")).ok()?;
    let recidivated_releases = parse_count(row, "recidivated_releases");
    let releases = parse_count(row, "releases");

    Some(RecidivismRateRecord {
        release_cohort,
        followup_years,
        recidivated_releases,
        releases,
        rate: rate(recidivated_releases, releases),
        demographics: demographic_fields(row),
    })
}

pub fn recidivism_rate_all_followup(rows: &[RawMetricRow]) -> Vec<RecidivismRateRecord> {
    rows.iter().filter_map(recidivism_rate).collect()
}

pub fn recidivism_rate_conventional_followup(rows: &[RawMetricRow]) -> Vec<RecidivismRateRecord> {
    rows.iter()
        .filter_map(recidivism_rate)
        .filter(|record| CONVENTIONAL_FOLLOWUP_YEARS.contains(&record.followup_years))
        .collect()
}
