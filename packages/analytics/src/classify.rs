//! Period and category classification for individual incidents.
//!
//! The `6months` window rolls with the reference instant, while `1year`
//! and `2years` are anchored to whole calendar years ending at a fixed
//! analysis year. Both anchors travel together in a [`ReferenceTime`].

use chrono::{DateTime, Datelike as _, Months, NaiveDate, NaiveDateTime, Utc};
use safety_trends_analytics_models::{CategorySelection, Period, TimeWindow};
use safety_trends_incident_models::{NON_VIOLENT_LABELS, PointRecord, VIOLENT_CRIME};
use safety_trends_ingest_models::SkipReason;

/// Naive date-time layouts accepted after RFC 3339, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts, interpreted as midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// The instant and calendar year that time windows are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTime {
    /// End of the rolling `6months` window.
    pub now: DateTime<Utc>,
    /// Last calendar year of the `1year` and `2years` windows.
    pub analysis_year: i32,
}

impl ReferenceTime {
    /// Creates a reference from an explicit instant and analysis year.
    #[must_use]
    pub const fn new(now: DateTime<Utc>, analysis_year: i32) -> Self {
        Self { now, analysis_year }
    }

    /// Uses the current wall-clock time as the rolling anchor.
    #[must_use]
    pub fn current(analysis_year: i32) -> Self {
        Self::new(Utc::now(), analysis_year)
    }
}

/// Parses an incident timestamp. Naive values are taken as UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Places `timestamp` in the recent or previous half of `window`.
///
/// - `6months`: recent is `[now - 6 months, now]`, previous is
///   `[now - 12 months, now - 6 months)`.
/// - `1year`: recent is the analysis year, previous the year before.
/// - `2years`: recent is the analysis year and the one before it,
///   previous the two years before those.
#[must_use]
pub fn classify_period(
    timestamp: DateTime<Utc>,
    window: TimeWindow,
    reference: &ReferenceTime,
) -> Period {
    match window {
        TimeWindow::SixMonths => {
            let now = reference.now;
            let (Some(six_back), Some(twelve_back)) = (
                now.checked_sub_months(Months::new(6)),
                now.checked_sub_months(Months::new(12)),
            ) else {
                return Period::Other;
            };
            if timestamp >= six_back && timestamp <= now {
                Period::Recent
            } else if timestamp >= twelve_back && timestamp < six_back {
                Period::Previous
            } else {
                Period::Other
            }
        }
        TimeWindow::OneYear => classify_years(timestamp.year(), reference.analysis_year, 1),
        TimeWindow::TwoYears => classify_years(timestamp.year(), reference.analysis_year, 2),
    }
}

/// Recent is the `span` years ending at `anchor`, previous the `span`
/// years before those.
const fn classify_years(year: i32, anchor: i32, span: i32) -> Period {
    let recent_start = anchor.saturating_sub(span - 1);
    let previous_start = recent_start.saturating_sub(span);
    if year >= recent_start && year <= anchor {
        Period::Recent
    } else if year >= previous_start && year < recent_start {
        Period::Previous
    } else {
        Period::Other
    }
}

/// Classifies a whole record, reporting why it cannot be bucketed.
///
/// Timestamp defects are checked first. A record that lands in the
/// recent or previous period but has no location is reported as
/// [`SkipReason::InvalidLocation`].
///
/// # Errors
///
/// Returns the [`SkipReason`] for records with a missing or unparseable
/// timestamp, or an in-window record without a location.
pub fn classify_record(
    record: &PointRecord,
    window: TimeWindow,
    reference: &ReferenceTime,
) -> Result<Period, SkipReason> {
    let raw = record
        .occurred_at
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(SkipReason::MissingTimestamp)?;
    let timestamp = parse_timestamp(raw).ok_or(SkipReason::InvalidTimestamp)?;

    let period = classify_period(timestamp, window, reference);
    if period != Period::Other && record.location.is_none() {
        return Err(SkipReason::InvalidLocation);
    }
    Ok(period)
}

/// Whether `record` passes the category selection.
///
/// An empty selection matches everything. Otherwise the record matches if
/// any selected token matches: [`VIOLENT_CRIME`] matches every label that
/// contains none of the [`NON_VIOLENT_LABELS`], and any other token
/// matches by case-sensitive substring.
#[must_use]
pub fn is_category_selected(record: &PointRecord, selection: &CategorySelection) -> bool {
    selection.is_empty()
        || selection.iter().any(|token| {
            if token == VIOLENT_CRIME {
                !NON_VIOLENT_LABELS
                    .iter()
                    .any(|label| record.category.contains(label))
            } else {
                record.category.contains(token)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn reference() -> ReferenceTime {
        ReferenceTime::new(at(2025, 7, 15), 2024)
    }

    fn labeled(category: &str) -> PointRecord {
        PointRecord::new(47.6, -122.3, "2024-05-01", category)
    }

    #[test]
    fn parses_supported_layouts() {
        for s in [
            "2024-01-15T14:30:00Z",
            "2024-01-15T14:30:00.000",
            "2024-01-15T14:30:00",
            "2024-01-15 14:30:00",
            "01/15/2024 02:30:00 PM",
        ] {
            let parsed = parse_timestamp(s).unwrap_or_else(|| panic!("failed to parse {s}"));
            assert_eq!(parsed.to_string(), "2024-01-15 14:30:00 UTC", "layout {s}");
        }
        assert_eq!(
            parse_timestamp("2024-01-15").unwrap().to_string(),
            "2024-01-15 00:00:00 UTC"
        );
        assert!(parse_timestamp("not-a-date").is_none());
        assert!(parse_timestamp("2024-13-40").is_none());
    }

    #[test]
    fn rfc3339_offsets_normalize_to_utc() {
        let parsed = parse_timestamp("2024-01-15T09:30:00-05:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap());
    }

    #[test]
    fn six_month_window_rolls_from_now() {
        let r = reference();
        assert_eq!(classify_period(at(2025, 7, 1), TimeWindow::SixMonths, &r), Period::Recent);
        assert_eq!(classify_period(at(2025, 1, 15), TimeWindow::SixMonths, &r), Period::Recent);
        assert_eq!(classify_period(at(2024, 12, 1), TimeWindow::SixMonths, &r), Period::Previous);
        assert_eq!(classify_period(at(2024, 7, 15), TimeWindow::SixMonths, &r), Period::Previous);
        assert_eq!(classify_period(at(2024, 6, 1), TimeWindow::SixMonths, &r), Period::Other);
        assert_eq!(classify_period(at(2025, 8, 1), TimeWindow::SixMonths, &r), Period::Other);
    }

    #[test]
    fn six_month_boundaries_are_half_open() {
        let r = reference();
        let six_back = r.now.checked_sub_months(Months::new(6)).unwrap();
        let twelve_back = r.now.checked_sub_months(Months::new(12)).unwrap();
        assert_eq!(classify_period(r.now, TimeWindow::SixMonths, &r), Period::Recent);
        assert_eq!(classify_period(six_back, TimeWindow::SixMonths, &r), Period::Recent);
        assert_eq!(classify_period(twelve_back, TimeWindow::SixMonths, &r), Period::Previous);
    }

    #[test]
    fn one_year_window_uses_calendar_years() {
        let r = reference();
        assert_eq!(classify_period(at(2024, 1, 1), TimeWindow::OneYear, &r), Period::Recent);
        assert_eq!(classify_period(at(2024, 12, 31), TimeWindow::OneYear, &r), Period::Recent);
        assert_eq!(classify_period(at(2023, 6, 1), TimeWindow::OneYear, &r), Period::Previous);
        assert_eq!(classify_period(at(2025, 1, 1), TimeWindow::OneYear, &r), Period::Other);
        assert_eq!(classify_period(at(2022, 6, 1), TimeWindow::OneYear, &r), Period::Other);
    }

    #[test]
    fn two_year_window_pairs_calendar_years() {
        let r = reference();
        assert_eq!(classify_period(at(2024, 3, 1), TimeWindow::TwoYears, &r), Period::Recent);
        assert_eq!(classify_period(at(2023, 3, 1), TimeWindow::TwoYears, &r), Period::Recent);
        assert_eq!(classify_period(at(2022, 3, 1), TimeWindow::TwoYears, &r), Period::Previous);
        assert_eq!(classify_period(at(2021, 3, 1), TimeWindow::TwoYears, &r), Period::Previous);
        assert_eq!(classify_period(at(2020, 3, 1), TimeWindow::TwoYears, &r), Period::Other);
    }

    #[test]
    fn calendar_windows_ignore_now() {
        let early = ReferenceTime::new(at(2000, 1, 1), 2024);
        let late = ReferenceTime::new(at(2030, 1, 1), 2024);
        let ts = at(2024, 5, 5);
        assert_eq!(
            classify_period(ts, TimeWindow::OneYear, &early),
            classify_period(ts, TimeWindow::OneYear, &late)
        );
    }

    #[test]
    fn record_defects_map_to_skip_reasons() {
        let r = reference();
        let mut record = labeled("Robbery");

        record.occurred_at = None;
        assert_eq!(
            classify_record(&record, TimeWindow::OneYear, &r),
            Err(SkipReason::MissingTimestamp)
        );

        record.occurred_at = Some("yesterday-ish".to_string());
        assert_eq!(
            classify_record(&record, TimeWindow::OneYear, &r),
            Err(SkipReason::InvalidTimestamp)
        );

        record.occurred_at = Some("2024-05-01".to_string());
        record.location = None;
        assert_eq!(
            classify_record(&record, TimeWindow::OneYear, &r),
            Err(SkipReason::InvalidLocation)
        );

        record.occurred_at = Some("1999-05-01".to_string());
        assert_eq!(
            classify_record(&record, TimeWindow::OneYear, &r),
            Ok(Period::Other)
        );
    }

    #[test]
    fn empty_selection_matches_everything() {
        assert!(is_category_selected(&labeled("Anything"), &CategorySelection::all()));
    }

    #[test]
    fn violent_crime_excludes_property_labels() {
        let selection: CategorySelection = [VIOLENT_CRIME].into_iter().collect();
        assert!(!is_category_selected(&labeled("Burglary Residential"), &selection));
        assert!(!is_category_selected(&labeled("Theft From Vehicle"), &selection));
        assert!(is_category_selected(&labeled("Aggravated Assault"), &selection));
    }

    #[test]
    fn tokens_match_by_case_sensitive_substring() {
        let selection: CategorySelection = ["Theft"].into_iter().collect();
        assert!(is_category_selected(&labeled("Motor Vehicle Theft"), &selection));
        assert!(!is_category_selected(&labeled("motor vehicle theft"), &selection));
    }

    #[test]
    fn selection_is_a_logical_or() {
        let selection: CategorySelection = ["Vandalism", VIOLENT_CRIME].into_iter().collect();
        assert!(is_category_selected(&labeled("Vandalism"), &selection));
        assert!(is_category_selected(&labeled("Robbery"), &selection));
        assert!(!is_category_selected(&labeled("Motor Vehicle Theft"), &selection));
    }

    #[test]
    fn extreme_analysis_years_do_not_overflow() {
        let timestamp = at(2024, 1, 1);
        for analysis_year in [i32::MIN, i32::MIN + 1, i32::MAX] {
            let reference = ReferenceTime::new(at(2025, 7, 15), analysis_year);
            for window in [TimeWindow::OneYear, TimeWindow::TwoYears] {
                assert_eq!(
                    classify_period(timestamp, window, &reference),
                    Period::Other,
                    "{window} anchored at {analysis_year}"
                );
            }
        }
    }
}
