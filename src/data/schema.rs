use super::Table;
use crate::error::{StreamError, StreamResult};

/// Required columns of one named dataset.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub dataset: &'static str,
    pub required: &'static [&'static str],
}

pub const ADMISSIONS: Schema = Schema {
    dataset: "admissions",
    required: &["date", "admissions"],
};

pub const DEMOGRAPHICS: Schema = Schema {
    dataset: "demographics",
    required: &["patient_id"],
};

pub const DISCHARGE: Schema = Schema {
    dataset: "discharge",
    required: &["patient_id", "admission_date", "discharge_date"],
};

pub const STAFF: Schema = Schema {
    dataset: "staff",
    required: &["date", "staff_count"],
};

pub const ICU: Schema = Schema {
    dataset: "icu",
    required: &["date"],
};

pub const EMERGENCY: Schema = Schema {
    dataset: "emergency",
    required: &["date", "emergency_cases"],
};

pub const DEPARTMENT: Schema = Schema {
    dataset: "department",
    required: &["date", "department", "patient_count"],
};

impl Schema {
    pub fn missing_columns(&self, table: &Table) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|col| !table.has_column(col))
            .collect()
    }

    pub fn validate(&self, table: &Table) -> StreamResult<()> {
        let missing = self.missing_columns(table);
        if missing.is_empty() {
            return Ok(());
        }

        Err(StreamError::MissingInput(format!(
            "{} dataset must have {} column(s); missing: {}",
            self.dataset,
            self.required.join(", "),
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_names_missing_columns() {
        let table = Table::from_reader("date,department\n".as_bytes()).unwrap();

        match DEPARTMENT.validate(&table) {
            Err(StreamError::MissingInput(msg)) => {
                assert!(msg.contains("department dataset"));
                assert!(msg.ends_with("missing: patient_count"));
            },
            other => panic!("expected MissingInput, got {:?}", other),
        }

        assert!(ICU.validate(&table).is_ok());
    }
}
