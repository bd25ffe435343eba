pub mod results;
pub mod streams;

use log::{info, warn, debug};
use crate::config::Config;
use crate::data::{self, Table, TimeSeriesRecord, ADMISSIONS, DEMOGRAPHICS, DISCHARGE, ICU};
use crate::error::{ForecastError, AppResult, StreamResult};
use crate::forecast::{ForecastPayload, LinearForecaster};
use crate::los::{LosEstimate, LosEstimator};
use crate::resources::{ResourcePayload, ResourcePlanner};

pub use results::*;

/// Decoded datasets for one run. The five required datasets are always
/// present; emergency and department data are optional.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub admissions: Table,
    pub demographics: Table,
    pub discharge: Table,
    pub staff: Table,
    pub icu: Table,
    pub emergency: Option<Table>,
    pub department: Option<Table>,
}

struct AdmissionsStream {
    history: Vec<TimeSeriesRecord>,
    payload: ForecastPayload,
}

pub struct Pipeline {
    config: Config,
    forecaster: LinearForecaster,
}

impl Pipeline {
    pub fn new(config: Config) -> AppResult<Self> {
        config.validate()?;
        let forecaster = LinearForecaster::new(config.horizon);
        Ok(Self { config, forecaster })
    }

    /// Runs every stream. Only a missing schema-critical column (admissions,
    /// discharge, ICU date) aborts the run; everything else is reported per
    /// stream inside the results.
    pub fn run(&self, inputs: &PipelineInputs) -> AppResult<PipelineResults> {
        Self::check_schema_critical(inputs)?;
        info!("Running forecast pipeline with a {}-day horizon", self.config.horizon);

        let ((admissions, los, resources), (icu, (emergency, departments))) = rayon::join(
            || self.run_capacity_chain(inputs),
            || rayon::join(
                || streams::forecast_icu(&self.forecaster, &inputs.icu),
                || rayon::join(
                    || inputs.emergency.as_ref()
                        .map(|table| streams::forecast_emergency(&self.forecaster, table)),
                    || inputs.department.as_ref()
                        .map(|table| streams::forecast_departments(
                            &self.forecaster, table, self.config.departments.min_rows)),
                ),
            ),
        );

        let results = PipelineResults {
            admissions: admissions.map(|stream| stream.payload).into(),
            los: los.into(),
            resources: resources.into(),
            icu: icu.into(),
            emergency: emergency.map(Outcome::from),
            departments: departments.map(Outcome::from),
        };

        let failures = results.failures();
        for (stream, error) in &failures {
            warn!("Stream '{}' failed: {}", stream, error);
        }
        info!(
            "Pipeline finished: {} forecast streams, {} failures",
            results.forecasts().len(),
            failures.len()
        );

        Ok(results)
    }

    fn check_schema_critical(inputs: &PipelineInputs) -> AppResult<()> {
        for (schema, table) in [
            (ADMISSIONS, &inputs.admissions),
            (DISCHARGE, &inputs.discharge),
            (ICU, &inputs.icu),
        ] {
            schema.validate(table).map_err(ForecastError::SchemaCritical)?;
        }
        Ok(())
    }

    /// Admissions forecast and LOS estimate run side by side; resource
    /// derivation waits for both.
    fn run_capacity_chain(
        &self,
        inputs: &PipelineInputs,
    ) -> (StreamResult<AdmissionsStream>, StreamResult<LosEstimate>, StreamResult<ResourcePayload>) {
        let (admissions, los) = rayon::join(
            || self.forecast_admissions(&inputs.admissions),
            || self.estimate_los(&inputs.discharge, &inputs.demographics),
        );

        let planner = ResourcePlanner::new(self.config.resources.fallback_ratio);
        let resources = planner.plan(
            admissions.as_ref().map(|s| (s.history.as_slice(), &s.payload.forecast)),
            los.as_ref(),
            &inputs.staff,
        );

        (admissions, los, resources)
    }

    fn forecast_admissions(&self, table: &Table) -> StreamResult<AdmissionsStream> {
        let history = data::time_series(table, "date", "admissions")?;
        debug!("Admissions history: {} rows", history.len());

        let payload = self.forecaster.forecast_with_chart("admissions", &history)?;
        Ok(AdmissionsStream { history, payload })
    }

    fn estimate_los(&self, discharge: &Table, demographics: &Table) -> StreamResult<LosEstimate> {
        DEMOGRAPHICS.validate(demographics)?;
        let discharges = data::discharge_records(discharge)?;
        let demographics = data::demographics(demographics)?;

        let estimate = LosEstimator::from_config(&self.config.los).estimate(&discharges, &demographics)?;
        info!("Estimated average LOS {:.2} days from {} patients", estimate.avg, estimate.patients);
        Ok(estimate)
    }
}
