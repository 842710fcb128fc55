//! Validation and raw-row helpers
//!
//! Source file name validation used by data sources, plus lenient column
//! accessors the transformers rely on to stay total over malformed rows.

use super::*;
use crate::records::{DemographicFields, TOTAL_KEY};
use lazy_static::lazy_static;
use regex::Regex;

const MAX_SOURCE_FILE_NAME_LENGTH: usize = 128;
const MAX_FILES_PER_REQUEST: usize = 32;

/// Validate a source file name
///
/// Source file names are lowercase snake_case identifiers:
/// - Must not be empty
/// - Must start with a lowercase letter
/// - Can contain lowercase letters, digits and underscores
///
/// # Examples
/// ```rust
/// use spotlight_metrics::validate_source_file_name;
///
/// assert!(validate_source_file_name("supervision_success_by_month").is_ok());
/// assert!(validate_source_file_name("").is_err());
/// ```
pub fn validate_source_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(metric_validation_error(
            "source_file_name",
            "Source file name cannot be empty",
        ));
    }

    if name.len() > MAX_SOURCE_FILE_NAME_LENGTH {
        return Err(metric_validation_error(
            "source_file_name",
            format!("Source file name too long (max {MAX_SOURCE_FILE_NAME_LENGTH} chars)"),
        ));
    }

    lazy_static! {
        static ref SOURCE_FILE_NAME_REGEX: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    }

    if !SOURCE_FILE_NAME_REGEX.is_match(name) {
        return Err(metric_validation_error(
            "source_file_name",
            format!("Invalid source file name {name:?} (must match [a-z][a-z0-9_]*)"),
        ));
    }

    Ok(())
}

/// Validate a complete fetch request
pub fn validate_fetch_request(request: &FetchMetricsRequest) -> Result<()> {
    if request.metric_names.is_empty() {
        return Err(metric_validation_error(
            "metric_names",
            "At least one source file must be requested",
        ));
    }

    if request.metric_names.len() > MAX_FILES_PER_REQUEST {
        return Err(metric_validation_error(
            "metric_names",
            format!("Too many source files (max {MAX_FILES_PER_REQUEST})"),
        ));
    }

    for name in &request.metric_names {
        validate_source_file_name(name)?;
    }

    Ok(())
}

/// Column value, or `""` when the column is missing
pub fn field<'a>(row: &'a RawMetricRow, key: &str) -> &'a str {
    row.get(key).map(|v| v.trim()).unwrap_or("")
}

/// Column value parsed as a non-negative count
///
/// Missing or unparseable values count as zero. Decimal strings such as
/// `"12.0"` are accepted and truncated.
pub fn parse_count(row: &RawMetricRow, key: &str) -> u64 {
    let raw = field(row, key);
    raw.parse::<u64>().unwrap_or_else(|_| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
            .unwrap_or(0)
    })
}

/// Column value parsed as a signed integer (years, months, cohorts)
pub fn parse_int(row: &RawMetricRow, key: &str) -> i64 {
    field(row, key).parse::<i64>().unwrap_or(0)
}

/// Ratio of two counts, zero when the denominator is zero
pub fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Demographic columns of a row, defaulting each to the total key
pub fn demographic_fields(row: &RawMetricRow) -> DemographicFields {
    let or_total = |key: &str| match field(row, key) {
        "" => TOTAL_KEY.to_string(),
        value => value.to_string(),
    };

    DemographicFields {
        race_or_ethnicity: or_total("race_or_ethnicity"),
        gender: or_total("gender"),
        age_bucket: or_total("age_bucket"),
    }
}

/// Build a raw row from `(column, value)` pairs
///
/// # Examples
/// ```rust
/// use spotlight_metrics::raw_row;
///
/// let row = raw_row([("district", "NORTHWEST"), ("total_population", "42")]);
/// assert_eq!(row["district"], "NORTHWEST");
/// ```
pub fn raw_row<I, K, V>(columns: I) -> RawMetricRow
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    columns
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_source_file_name_valid() {
        assert!(validate_source_file_name("recidivism_rates_by_cohort_by_year").is_ok());
        assert!(validate_source_file_name("active_program_participation_by_region").is_ok());
        assert!(validate_source_file_name("file2").is_ok());
    }

    #[test]
    fn test_validate_source_file_name_invalid() {
        assert!(validate_source_file_name("").is_err());
        assert!(validate_source_file_name("2_leading_digit").is_err());
        assert!(validate_source_file_name("Upper_Case").is_err());
        assert!(validate_source_file_name("with space").is_err());
        assert!(validate_source_file_name("with-dash").is_err());
        assert!(validate_source_file_name(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_fetch_request() {
        let request = FetchMetricsRequest::new(TenantId::UsNd, ["supervision_success_by_month"]);
        assert!(validate_fetch_request(&request).is_ok());

        let empty = FetchMetricsRequest::new(TenantId::UsNd, Vec::<String>::new());
        assert!(validate_fetch_request(&empty).is_err());

        let too_many = FetchMetricsRequest::new(
            TenantId::UsNd,
            (0..33).map(|i| format!("file_{i}")),
        );
        assert!(validate_fetch_request(&too_many).is_err());

        let bad_name = FetchMetricsRequest::new(TenantId::UsNd, ["ok_name", "Bad Name"]);
        assert!(validate_fetch_request(&bad_name).is_err());
    }

    #[test]
    fn test_parse_count() {
        let row = raw_row([
            ("plain", "42"),
            ("decimal", "12.0"),
            ("padded", " 7 "),
            ("negative", "-3"),
            ("garbage", "n/a"),
        ]);

        assert_eq!(parse_count(&row, "plain"), 42);
        assert_eq!(parse_count(&row, "decimal"), 12);
        assert_eq!(parse_count(&row, "padded"), 7);
        assert_eq!(parse_count(&row, "negative"), 0);
        assert_eq!(parse_count(&row, "garbage"), 0);
        assert_eq!(parse_count(&row, "missing"), 0);
    }

    #[test]
    fn test_parse_int() {
        let row = raw_row([("year", "2020"), ("month", "x")]);
        assert_eq!(parse_int(&row, "year"), 2020);
        assert_eq!(parse_int(&row, "month"), 0);
    }

    #[test]
    fn test_rate() {
        assert_eq!(rate(1, 4), 0.25);
        assert_eq!(rate(5, 0), 0.0);
    }

    #[test]
    fn test_demographic_fields_default_to_total() {
        let row = raw_row([("gender", "MALE"), ("age_bucket", "")]);
        let fields = demographic_fields(&row);

        assert_eq!(fields.gender, "MALE");
        assert_eq!(fields.age_bucket, "ALL");
        assert_eq!(fields.race_or_ethnicity, "ALL");
    }
}
