use std::collections::HashMap;
use serde::Serialize;
use log::{debug, warn};
use crate::config::{LosConfig, NegativeLosPolicy};
use crate::data::{parse_value, Demographics, DemographicRecord, DischargeRecord};
use crate::error::{StreamError, StreamResult};
use crate::models::{RandomForest, Regressor};

/// Representative length of stay: the forest's prediction at the mean
/// demographic profile of the joined population.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LosEstimate {
    pub avg: f64,
    pub patients: usize,
    pub features: Vec<String>,
}

pub struct LosEstimator {
    n_trees: usize,
    seed: u64,
    min_samples_split: usize,
    negative_los: NegativeLosPolicy,
}

struct JoinedRow<'a> {
    los: f64,
    demographics: &'a DemographicRecord,
}

impl LosEstimator {
    pub fn from_config(config: &LosConfig) -> Self {
        Self {
            n_trees: config.n_trees,
            seed: config.seed,
            min_samples_split: config.min_samples_split,
            negative_los: config.negative_los,
        }
    }

    pub fn estimate(&self, discharges: &[DischargeRecord], demographics: &Demographics) -> StreamResult<LosEstimate> {
        let stays = self.lengths_of_stay(discharges)?;
        let joined = inner_join(discharges, &stays, demographics);

        if joined.is_empty() {
            return Err(StreamError::JoinMismatch(format!(
                "None of {} discharge records matched a patient_id in demographics",
                discharges.len()
            )));
        }
        debug!("Joined {} of {} discharges with demographics", joined.len(), discharges.len());

        let (features, columns) = feature_matrix(&joined, demographics)?;
        let target: Vec<f64> = joined.iter().map(|r| r.los).collect();

        let mut forest = RandomForest::new(self.n_trees, self.seed)
            .with_min_samples_split(self.min_samples_split);
        forest.fit(&features, &target)?;

        let profile = column_means(&features);
        let avg = forest.predict_one(&profile)?;

        Ok(LosEstimate {
            avg,
            patients: joined.len(),
            features: columns,
        })
    }

    fn lengths_of_stay(&self, discharges: &[DischargeRecord]) -> StreamResult<Vec<f64>> {
        let negative = discharges.iter().filter(|d| d.los() < 0).count();

        if negative > 0 {
            match self.negative_los {
                NegativeLosPolicy::PassThrough => warn!(
                    "{} discharge record(s) leave before admission; negative LOS used as-is", negative
                ),
                NegativeLosPolicy::Clamp => warn!(
                    "{} discharge record(s) leave before admission; LOS clamped to 0", negative
                ),
                NegativeLosPolicy::Reject => return Err(StreamError::MalformedData(format!(
                    "{} discharge record(s) have discharge_date before admission_date", negative
                ))),
            }
        }

        Ok(discharges.iter()
            .map(|d| match self.negative_los {
                NegativeLosPolicy::Clamp => d.los().max(0) as f64,
                _ => d.los() as f64,
            })
            .collect())
    }
}

/// Discharge order is kept; a patient with several demographic rows
/// contributes one joined row per match.
fn inner_join<'a>(
    discharges: &[DischargeRecord],
    stays: &[f64],
    demographics: &'a Demographics,
) -> Vec<JoinedRow<'a>> {
    let mut by_patient: HashMap<&str, Vec<&DemographicRecord>> = HashMap::new();
    for record in &demographics.records {
        by_patient.entry(record.patient_id.as_str()).or_default().push(record);
    }

    discharges.iter()
        .zip(stays)
        .flat_map(|(discharge, &los)| {
            by_patient.get(discharge.patient_id.as_str())
                .into_iter()
                .flatten()
                .map(move |&demo| JoinedRow { los, demographics: demo })
        })
        .collect()
}

/// Encodes gender as M = 0, F = 1 (anything else 0); every other column
/// must be numeric.
fn feature_matrix(rows: &[JoinedRow], demographics: &Demographics) -> StreamResult<(Vec<Vec<f64>>, Vec<String>)> {
    let used: Vec<(usize, &String)> = demographics.columns
        .iter()
        .enumerate()
        .filter(|(_, name)| name.as_str() != "los")
        .collect();

    if used.is_empty() {
        return Err(StreamError::Fit(
            "Demographics have no attribute columns besides patient_id".to_string()
        ));
    }

    let mut matrix = Vec::with_capacity(rows.len());
    for row in rows {
        let mut features = Vec::with_capacity(used.len());
        for &(idx, name) in &used {
            let raw = row.demographics.values.get(idx).map(String::as_str).unwrap_or("");
            let value = if name == "gender" {
                encode_gender(raw)
            } else {
                parse_value(raw, name).map_err(|e| StreamError::Fit(e.to_string()))?
            };
            features.push(value);
        }
        matrix.push(features);
    }

    Ok((matrix, used.into_iter().map(|(_, name)| name.clone()).collect()))
}

fn encode_gender(raw: &str) -> f64 {
    match raw.trim() {
        "F" => 1.0,
        _ => 0.0,
    }
}

fn column_means(matrix: &[Vec<f64>]) -> Vec<f64> {
    let n = matrix.len() as f64;
    let width = matrix.first().map_or(0, Vec::len);
    (0..width)
        .map(|j| matrix.iter().map(|row| row[j]).sum::<f64>() / n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{demographics, discharge_records, Table};
    use approx::assert_relative_eq;

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    fn estimator() -> LosEstimator {
        LosEstimator::from_config(&LosConfig::default())
    }

    fn uniform_stay_inputs(days: i64) -> (Vec<DischargeRecord>, Demographics) {
        let mut disc = String::from("patient_id,admission_date,discharge_date\n");
        let mut demo = String::from("patient_id,age,gender\n");
        for i in 0..20 {
            let admitted = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i);
            let discharged = admitted + chrono::Duration::days(days);
            disc.push_str(&format!("p{},{},{}\n", i, admitted, discharged));
            demo.push_str(&format!("p{},{},{}\n", i, 30 + i, if i % 2 == 0 { "M" } else { "F" }));
        }
        (
            discharge_records(&table(&disc)).unwrap(),
            demographics(&table(&demo)).unwrap(),
        )
    }

    #[test]
    fn test_uniform_stays_estimate_exactly() {
        let (discharges, demo) = uniform_stay_inputs(4);
        let estimate = estimator().estimate(&discharges, &demo).unwrap();

        assert_relative_eq!(estimate.avg, 4.0);
        assert_eq!(estimate.patients, 20);
        assert_eq!(estimate.features, vec!["age".to_string(), "gender".to_string()]);
    }

    #[test]
    fn test_unmatched_patients_are_dropped() {
        let discharges = discharge_records(&table(
            "patient_id,admission_date,discharge_date\n\
             a,2024-01-01,2024-01-03\n\
             b,2024-01-01,2024-01-09\n"
        )).unwrap();
        let demo = demographics(&table("patient_id,age\na,50\n")).unwrap();

        let estimate = estimator().estimate(&discharges, &demo).unwrap();
        assert_eq!(estimate.patients, 1);
        assert_relative_eq!(estimate.avg, 2.0);
    }

    #[test]
    fn test_empty_join_is_mismatch() {
        let discharges = discharge_records(&table(
            "patient_id,admission_date,discharge_date\nx,2024-01-01,2024-01-03\n"
        )).unwrap();
        let demo = demographics(&table("patient_id,age\ny,50\n")).unwrap();

        let result = estimator().estimate(&discharges, &demo);
        assert!(matches!(result, Err(StreamError::JoinMismatch(_))));
    }

    #[test]
    fn test_non_numeric_attribute_fails_fit() {
        let discharges = discharge_records(&table(
            "patient_id,admission_date,discharge_date\na,2024-01-01,2024-01-03\n"
        )).unwrap();
        let demo = demographics(&table("patient_id,insurance\na,medicare\n")).unwrap();

        let result = estimator().estimate(&discharges, &demo);
        match result {
            Err(StreamError::Fit(msg)) => assert!(msg.contains("insurance")),
            other => panic!("expected Fit error, got {:?}", other),
        }
    }

    #[test]
    fn test_gender_encoding() {
        assert_eq!(encode_gender("M"), 0.0);
        assert_eq!(encode_gender("F"), 1.0);
        assert_eq!(encode_gender(""), 0.0);
        assert_eq!(encode_gender("other"), 0.0);
    }

    #[test]
    fn test_negative_los_policies() {
        let discharges = discharge_records(&table(
            "patient_id,admission_date,discharge_date\na,2024-01-05,2024-01-02\n"
        )).unwrap();
        let demo = demographics(&table("patient_id,age\na,40\n")).unwrap();

        let passed = estimator().estimate(&discharges, &demo).unwrap();
        assert_relative_eq!(passed.avg, -3.0);

        let mut config = LosConfig::default();
        config.negative_los = NegativeLosPolicy::Clamp;
        let clamped = LosEstimator::from_config(&config).estimate(&discharges, &demo).unwrap();
        assert_relative_eq!(clamped.avg, 0.0);

        config.negative_los = NegativeLosPolicy::Reject;
        let rejected = LosEstimator::from_config(&config).estimate(&discharges, &demo);
        assert!(matches!(rejected, Err(StreamError::MalformedData(_))));
    }

    #[test]
    fn test_estimate_is_reproducible() {
        let discharges = discharge_records(&table(
            "patient_id,admission_date,discharge_date\n\
             a,2024-01-01,2024-01-02\n\
             b,2024-01-01,2024-01-06\n\
             c,2024-01-01,2024-01-04\n\
             d,2024-01-01,2024-01-12\n"
        )).unwrap();
        let demo = demographics(&table(
            "patient_id,age,gender\na,25,M\nb,71,F\nc,44,F\nd,83,M\n"
        )).unwrap();

        let first = estimator().estimate(&discharges, &demo).unwrap();
        let second = estimator().estimate(&discharges, &demo).unwrap();
        assert_eq!(first.avg.to_bits(), second.avg.to_bits());
        assert!(first.avg >= 1.0 && first.avg <= 11.0);
    }
}
