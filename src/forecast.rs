use chrono::{Days, NaiveDate};
use serde::Serialize;
use log::{debug, warn};
use crate::data::TimeSeriesRecord;
use crate::error::{StreamError, StreamResult};
use crate::features::{future_features, historical_features, sort_by_date, FEATURE_NAMES};
use crate::models::{LinearRegression, Regressor};

/// Forecast of one stream. Both vectors have exactly `horizon` entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    #[serde(rename = "dates")]
    pub future_dates: Vec<NaiveDate>,
    #[serde(rename = "values")]
    pub predicted_values: Vec<f64>,
}

impl ForecastResult {
    pub fn len(&self) -> usize {
        self.future_dates.len()
    }
}

/// Everything an external renderer needs to draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartHandoff {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub x: Vec<NaiveDate>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPayload {
    #[serde(flatten)]
    pub forecast: ForecastResult,
    pub chart: ChartHandoff,
}

/// Consecutive calendar days starting the day after `last`.
pub fn future_dates(last: NaiveDate, horizon: usize) -> StreamResult<Vec<NaiveDate>> {
    (1..=horizon as u64)
        .map(|offset| last.checked_add_days(Days::new(offset)).ok_or_else(||
            StreamError::MalformedData(format!("Date overflow extending {} by {} days", last, offset))))
        .collect()
}

/// OLS on calendar features, extrapolated over a fixed horizon.
#[derive(Debug, Clone, Copy)]
pub struct LinearForecaster {
    horizon: usize,
}

impl LinearForecaster {
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    pub fn forecast(&self, records: &[TimeSeriesRecord]) -> StreamResult<ForecastResult> {
        let sorted = sort_by_date(records);
        let last = sorted.last()
            .map(|r| r.date)
            .ok_or_else(|| StreamError::Fit("No observations to fit".to_string()))?;

        let x: Vec<Vec<f64>> = historical_features(&sorted)
            .iter()
            .map(|f| f.to_row().to_vec())
            .collect();
        let y: Vec<f64> = sorted.iter().map(|r| r.value).collect();

        let mut model = LinearRegression::new();
        model.fit(&x, &y)?;

        if sorted.len() <= FEATURE_NAMES.len() {
            warn!(
                "Fit on {} rows for {} features plus intercept is under-determined; using minimum-norm solution",
                sorted.len(),
                FEATURE_NAMES.len()
            );
        }
        debug!(
            "OLS rank {}/{}, intercept {:.4}, coefficients {:?}",
            model.rank(),
            FEATURE_NAMES.len(),
            model.intercept(),
            model.coefficients()
        );

        let future_dates = future_dates(last, self.horizon)?;
        let future_x: Vec<Vec<f64>> = future_features(sorted.len(), &future_dates)
            .iter()
            .map(|f| f.to_row().to_vec())
            .collect();
        let predicted_values = model.predict(&future_x)?;

        Ok(ForecastResult { future_dates, predicted_values })
    }

    /// Forecast plus a chart handoff showing history and forecast.
    pub fn forecast_with_chart(&self, metric: &str, records: &[TimeSeriesRecord]) -> StreamResult<ForecastPayload> {
        let sorted = sort_by_date(records);
        let forecast = self.forecast(&sorted)?;

        let chart = ChartHandoff {
            title: format!("{} Forecast", metric),
            x_label: "Date".to_string(),
            y_label: metric.to_string(),
            series: vec![
                ChartSeries {
                    label: "Historical".to_string(),
                    x: sorted.iter().map(|r| r.date).collect(),
                    y: sorted.iter().map(|r| r.value).collect(),
                },
                ChartSeries {
                    label: "Forecast".to_string(),
                    x: forecast.future_dates.clone(),
                    y: forecast.predicted_values.clone(),
                },
            ],
        };

        Ok(ForecastPayload { forecast, chart })
    }
}
