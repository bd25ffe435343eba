//! Calendar features for the linear forecaster.
//!
//! `time_idx` is the rank of a record after sorting by date, not elapsed
//! days. Gaps in the history therefore compress the apparent trend; no
//! interpolation is done.

use chrono::{Datelike, NaiveDate};
use crate::data::TimeSeriesRecord;

pub const FEATURE_NAMES: [&str; 4] = ["time_idx", "day_of_week", "day_of_month", "month"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub time_idx: usize,
    pub day_of_week: u32,   // Monday = 0
    pub day_of_month: u32,
    pub month: u32,
}

impl FeatureVector {
    pub fn new(time_idx: usize, date: NaiveDate) -> Self {
        Self {
            time_idx,
            day_of_week: date.weekday().num_days_from_monday(),
            day_of_month: date.day(),
            month: date.month(),
        }
    }

    pub fn to_row(&self) -> [f64; 4] {
        [
            self.time_idx as f64,
            self.day_of_week as f64,
            self.day_of_month as f64,
            self.month as f64,
        ]
    }
}

/// Stable sort by date; duplicate dates keep their input order.
pub fn sort_by_date(records: &[TimeSeriesRecord]) -> Vec<TimeSeriesRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.date);
    sorted
}

/// One feature vector per record. `records` must already be sorted.
pub fn historical_features(records: &[TimeSeriesRecord]) -> Vec<FeatureVector> {
    records.iter()
        .enumerate()
        .map(|(idx, r)| FeatureVector::new(idx, r.date))
        .collect()
}

/// Features for future dates, continuing the index after `n_history`.
pub fn future_features(n_history: usize, future_dates: &[NaiveDate]) -> Vec<FeatureVector> {
    future_dates.iter()
        .enumerate()
        .map(|(i, &date)| FeatureVector::new(n_history + i, date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, value: f64) -> TimeSeriesRecord {
        TimeSeriesRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            value,
        }
    }

    #[test]
    fn test_index_assigned_after_sorting() {
        let records = vec![
            record("2024-01-10", 3.0),
            record("2024-01-01", 1.0),
            record("2024-01-05", 2.0),
        ];

        let sorted = sort_by_date(&records);
        let features = historical_features(&sorted);

        assert_eq!(sorted[0].value, 1.0);
        assert_eq!(features[0].time_idx, 0);
        assert_eq!(features[2].time_idx, 2);
        // Gap of five days still advances the index by one
        assert_eq!(features[2].day_of_month, 10);
    }

    #[test]
    fn test_calendar_fields() {
        // 2024-02-29 is a Thursday
        let f = FeatureVector::new(7, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(f.day_of_week, 3);
        assert_eq!(f.day_of_month, 29);
        assert_eq!(f.month, 2);
        assert_eq!(f.to_row(), [7.0, 3.0, 29.0, 2.0]);
    }

    #[test]
    fn test_duplicate_dates_kept_in_input_order() {
        let records = vec![record("2024-01-02", 9.0), record("2024-01-01", 1.0), record("2024-01-02", 4.0)];
        let sorted = sort_by_date(&records);
        assert_eq!(sorted.len(), 3);
        assert_eq!(sorted[1].value, 9.0);
        assert_eq!(sorted[2].value, 4.0);
    }

    #[test]
    fn test_future_index_continues() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        ];
        let features = future_features(3, &dates);
        assert_eq!(features[0].time_idx, 3);
        assert_eq!(features[1].time_idx, 4);
    }
}
