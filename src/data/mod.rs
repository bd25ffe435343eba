pub mod schema;
pub mod records;

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use crate::error::AppResult;

pub use schema::*;
pub use records::*;

/// Decoded tabular dataset. Headers are lower-cased and trimmed on
/// construction so column lookup is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers
            .into_iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        Self { headers, rows }
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.headers.iter().position(|h| *h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of one column; short rows read as blank.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| cell(row, idx)).collect())
    }

    /// Splits rows by the value of `column`, keeping first-appearance order
    /// of the keys and the original row order inside each partition.
    pub fn partition_by(&self, column: &str) -> Option<Vec<(String, Table)>> {
        let idx = self.column_index(column)?;

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Vec<String>>> = HashMap::new();

        for row in &self.rows {
            let key = cell(row, idx).to_string();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(row.clone());
        }

        Some(order
            .into_iter()
            .map(|key| {
                let rows = groups.remove(&key).unwrap_or_default();
                let table = Table { headers: self.headers.clone(), rows };
                (key, table)
            })
            .collect())
    }
}

pub(crate) fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}
