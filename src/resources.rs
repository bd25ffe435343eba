use std::collections::HashMap;
use chrono::NaiveDate;
use serde::Serialize;
use log::{debug, warn};
use crate::data::{self, TimeSeriesRecord, Table, STAFF};
use crate::error::{StreamError, StreamResult};
use crate::forecast::{ChartHandoff, ChartSeries, ForecastResult};
use crate::los::LosEstimate;

/// Projected bed and staff needs, aligned with the admissions forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceProjection {
    pub dates: Vec<NaiveDate>,
    #[serde(rename = "beds")]
    pub beds_needed: Vec<f64>,
    #[serde(rename = "staff")]
    pub staff_needed: Vec<f64>,
    pub staff_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourcePayload {
    #[serde(flatten)]
    pub projection: ResourceProjection,
    pub chart: ChartHandoff,
}

/// Historical staff per occupied bed over dates present in both series.
/// Falls back to `fallback` when the join is empty or implies no beds.
pub fn staff_ratio(
    admissions: &[TimeSeriesRecord],
    staff: &[TimeSeriesRecord],
    los: f64,
    fallback: f64,
) -> f64 {
    let mut staff_by_date: HashMap<NaiveDate, Vec<f64>> = HashMap::new();
    for record in staff {
        staff_by_date.entry(record.date).or_default().push(record.value);
    }

    let pairs: Vec<(f64, f64)> = admissions.iter()
        .flat_map(|adm| {
            staff_by_date.get(&adm.date)
                .into_iter()
                .flatten()
                .map(move |&count| (adm.value, count))
        })
        .collect();

    if pairs.is_empty() {
        warn!("No dates shared by admissions and staff history; using fallback ratio {}", fallback);
        return fallback;
    }

    let n = pairs.len() as f64;
    let avg_staff = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let avg_beds = pairs.iter().map(|p| p.0).sum::<f64>() / n * los;
    debug!("Staff ratio inputs over {} joined rows: avg_staff {:.3}, avg_beds {:.3}", pairs.len(), avg_staff, avg_beds);

    if avg_beds > 0.0 {
        avg_staff / avg_beds
    } else {
        warn!("Historical bed demand is {:.3}; using fallback ratio {}", avg_beds, fallback);
        fallback
    }
}

/// Ceiling rounding on both steps so planning never under-provisions.
pub fn derive_resources(forecast: &ForecastResult, los: f64, ratio: f64) -> ResourceProjection {
    let beds_needed: Vec<f64> = forecast.predicted_values
        .iter()
        .map(|admissions| (admissions * los).ceil())
        .collect();
    let staff_needed = beds_needed.iter().map(|beds| (beds * ratio).ceil()).collect();

    ResourceProjection {
        dates: forecast.future_dates.clone(),
        beds_needed,
        staff_needed,
        staff_ratio: ratio,
    }
}

pub struct ResourcePlanner {
    fallback_ratio: f64,
}

impl ResourcePlanner {
    pub fn new(fallback_ratio: f64) -> Self {
        Self { fallback_ratio }
    }

    /// Runs only when both upstream results exist; an upstream failure is
    /// reported as a dependency error, never replaced by a default.
    pub fn plan(
        &self,
        admissions: Result<(&[TimeSeriesRecord], &ForecastResult), &StreamError>,
        los: Result<&LosEstimate, &StreamError>,
        staff: &Table,
    ) -> StreamResult<ResourcePayload> {
        let (history, forecast) = admissions.map_err(|e|
            StreamError::Dependency(format!("admissions forecast unavailable ({})", e)))?;
        let los = los.map_err(|e|
            StreamError::Dependency(format!("LOS estimate unavailable ({})", e)))?;

        STAFF.validate(staff)?;
        let staff_history = data::time_series(staff, "date", "staff_count")?;

        let ratio = staff_ratio(history, &staff_history, los.avg, self.fallback_ratio);
        let projection = derive_resources(forecast, los.avg, ratio);

        let chart = ChartHandoff {
            title: format!("Bed & Staff Needs Forecast (Next {} days)", projection.dates.len()),
            x_label: "Date".to_string(),
            y_label: "Count".to_string(),
            series: vec![
                ChartSeries {
                    label: "Beds Needed".to_string(),
                    x: projection.dates.clone(),
                    y: projection.beds_needed.clone(),
                },
                ChartSeries {
                    label: "Staff Needed".to_string(),
                    x: projection.dates.clone(),
                    y: projection.staff_needed.clone(),
                },
            ],
        };

        Ok(ResourcePayload { projection, chart })
    }
}
