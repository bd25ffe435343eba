use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use super::{cell, Table};
use crate::error::{StreamError, StreamResult};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSeriesRecord {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DischargeRecord {
    pub patient_id: String,
    pub admission_date: NaiveDate,
    pub discharge_date: NaiveDate,
}

impl DischargeRecord {
    /// Whole days between admission and discharge. Negative when the
    /// discharge precedes the admission.
    pub fn los(&self) -> i64 {
        (self.discharge_date - self.admission_date).num_days()
    }
}

/// Patient attribute rows; `values` align with `Demographics::columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicRecord {
    pub patient_id: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Demographics {
    pub columns: Vec<String>,
    pub records: Vec<DemographicRecord>,
}

pub fn parse_date(raw: &str) -> StreamResult<NaiveDate> {
    let raw = raw.trim();

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt.date());
        }
    }

    Err(StreamError::MalformedData(format!("Unparseable date: '{}'", raw)))
}

pub fn parse_value(raw: &str, column: &str) -> StreamResult<f64> {
    let raw = raw.trim();
    let value: f64 = raw.parse().map_err(|_| StreamError::MalformedData(
        format!("Column '{}' has non-numeric value '{}'", column, raw)
    ))?;

    if !value.is_finite() {
        return Err(StreamError::MalformedData(
            format!("Column '{}' has non-finite value '{}'", column, raw)
        ));
    }

    Ok(value)
}

fn require_column<'a>(table: &'a Table, column: &str) -> StreamResult<Vec<&'a str>> {
    table.column(column).ok_or_else(||
        StreamError::MissingInput(format!("Missing column: {}", column)))
}

pub fn parse_dates(table: &Table, column: &str) -> StreamResult<Vec<NaiveDate>> {
    require_column(table, column)?
        .into_iter()
        .map(parse_date)
        .collect()
}

pub fn parse_values(table: &Table, column: &str) -> StreamResult<Vec<f64>> {
    require_column(table, column)?
        .into_iter()
        .map(|raw| parse_value(raw, column))
        .collect()
}

pub fn zip_series(dates: &[NaiveDate], values: &[f64]) -> Vec<TimeSeriesRecord> {
    dates.iter()
        .zip(values)
        .map(|(&date, &value)| TimeSeriesRecord { date, value })
        .collect()
}

/// Reads one dated metric column, in file order.
pub fn time_series(table: &Table, date_col: &str, value_col: &str) -> StreamResult<Vec<TimeSeriesRecord>> {
    let dates = parse_dates(table, date_col)?;
    let values = parse_values(table, value_col)?;
    Ok(zip_series(&dates, &values))
}

pub fn discharge_records(table: &Table) -> StreamResult<Vec<DischargeRecord>> {
    let patient_ids = require_column(table, "patient_id")?;
    let admitted = parse_dates(table, "admission_date")?;
    let discharged = parse_dates(table, "discharge_date")?;

    Ok(patient_ids
        .into_iter()
        .zip(admitted.into_iter().zip(discharged))
        .map(|(id, (admission_date, discharge_date))| DischargeRecord {
            patient_id: id.to_string(),
            admission_date,
            discharge_date,
        })
        .collect())
}

/// Splits the demographics table into the patient key and every other
/// column, which stays as raw text until the LOS feature matrix is built.
pub fn demographics(table: &Table) -> StreamResult<Demographics> {
    let id_idx = table.column_index("patient_id").ok_or_else(||
        StreamError::MissingInput("Missing column: patient_id".to_string()))?;

    let attr_idx: Vec<usize> = (0..table.headers().len())
        .filter(|&i| i != id_idx)
        .collect();

    let columns = attr_idx.iter().map(|&i| table.headers()[i].clone()).collect();

    let records = table.rows()
        .iter()
        .map(|row| DemographicRecord {
            patient_id: cell(row, id_idx).to_string(),
            values: attr_idx.iter().map(|&i| cell(row, i).to_string()).collect(),
        })
        .collect();

    Ok(Demographics { columns, records })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-03-05").unwrap(), date(2024, 3, 5));
        assert_eq!(parse_date("2024/03/05").unwrap(), date(2024, 3, 5));
        assert_eq!(parse_date("03/05/2024").unwrap(), date(2024, 3, 5));
        assert_eq!(parse_date("2024-03-05 17:45:00").unwrap(), date(2024, 3, 5));
        assert_eq!(parse_date("2024-03-05T08:00:00").unwrap(), date(2024, 3, 5));
        assert!(matches!(parse_date("yesterday"), Err(StreamError::MalformedData(_))));
    }

    #[test]
    fn test_parse_value_rejects_blank_and_non_finite() {
        assert_eq!(parse_value(" 12.5 ", "beds").unwrap(), 12.5);
        assert!(parse_value("", "beds").is_err());
        assert!(parse_value("n/a", "beds").is_err());
        assert!(parse_value("NaN", "beds").is_err());
        assert!(parse_value("inf", "beds").is_err());
    }

    #[test]
    fn test_discharge_los_may_be_negative() {
        let csv = "patient_id,admission_date,discharge_date\n\
                   p1,2024-01-01,2024-01-05\n\
                   p2,2024-01-10,2024-01-08\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();

        let records = discharge_records(&table).unwrap();
        assert_eq!(records[0].los(), 4);
        assert_eq!(records[1].los(), -2);
    }

    #[test]
    fn test_demographics_splits_patient_id() {
        let csv = "age,patient_id,gender\n64,p1,F\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();

        let demo = demographics(&table).unwrap();
        assert_eq!(demo.columns, vec!["age".to_string(), "gender".to_string()]);
        assert_eq!(demo.records[0].patient_id, "p1");
        assert_eq!(demo.records[0].values, vec!["64".to_string(), "F".to_string()]);
    }

    #[test]
    fn test_time_series_keeps_file_order() {
        let csv = "date,admissions\n2024-01-03,7\n2024-01-01,5\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();

        let series = time_series(&table, "date", "admissions").unwrap();
        assert_eq!(series[0], TimeSeriesRecord { date: date(2024, 1, 3), value: 7.0 });
        assert_eq!(series[1].date, date(2024, 1, 1));
    }
}
