use rayon::prelude::*;
use log::debug;
use super::{Outcome, StreamGroup};
use crate::data::{self, Table, DEPARTMENT, EMERGENCY};
use crate::error::{StreamError, StreamResult};
use crate::forecast::{ForecastPayload, LinearForecaster};

/// Forecasts every non-date ICU column on its own. The shared date column
/// is parsed once; a bad date fails the whole group, a bad value only its
/// own metric.
pub fn forecast_icu(forecaster: &LinearForecaster, icu: &Table) -> StreamResult<StreamGroup> {
    let dates = data::parse_dates(icu, "date")?;
    let metrics: Vec<&String> = icu.headers().iter().filter(|h| h.as_str() != "date").collect();
    debug!("ICU dataset: {} rows, {} metric streams", dates.len(), metrics.len());

    Ok(metrics
        .par_iter()
        .map(|&metric| {
            let result = data::parse_values(icu, metric).and_then(|values| {
                forecaster.forecast_with_chart(metric, &data::zip_series(&dates, &values))
            });
            (metric.clone(), Outcome::from(result))
        })
        .collect())
}

pub fn forecast_emergency(forecaster: &LinearForecaster, emergency: &Table) -> StreamResult<ForecastPayload> {
    EMERGENCY.validate(emergency)?;
    let series = data::time_series(emergency, "date", "emergency_cases")?;
    forecaster.forecast_with_chart("emergency_cases", &series)
}

/// One forecast per department value. Rows are parsed per partition, so a
/// malformed row only fails its own department.
pub fn forecast_departments(
    forecaster: &LinearForecaster,
    departments: &Table,
    min_rows: usize,
) -> StreamResult<StreamGroup> {
    DEPARTMENT.validate(departments)?;
    let partitions = departments.partition_by("department").ok_or_else(||
        StreamError::MissingInput("Missing column: department".to_string()))?;
    debug!("Department dataset: {} rows in {} departments", departments.len(), partitions.len());

    Ok(partitions
        .par_iter()
        .map(|(name, rows)| {
            let result = if rows.len() < min_rows {
                Err(StreamError::InsufficientData(format!(
                    "Department '{}' has {} row(s), at least {} required", name, rows.len(), min_rows
                )))
            } else {
                data::time_series(rows, "date", "patient_count").and_then(|series| {
                    forecaster.forecast_with_chart(&format!("{} patient_count", name), &series)
                })
            };
            (name.clone(), Outcome::from(result))
        })
        .collect())
}
