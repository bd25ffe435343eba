pub mod linear;
pub mod forest;

use crate::error::{StreamError, StreamResult};

pub use linear::LinearRegression;
pub use forest::RandomForest;

pub trait Regressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> StreamResult<()>;
    fn predict_one(&self, row: &[f64]) -> StreamResult<f64>;

    fn predict(&self, rows: &[Vec<f64>]) -> StreamResult<Vec<f64>> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }
}

/// Checks the design matrix is rectangular, finite and matches the target.
/// Returns the number of feature columns.
pub fn check_training_data(x: &[Vec<f64>], y: &[f64]) -> StreamResult<usize> {
    if x.is_empty() {
        return Err(StreamError::Fit("No training rows".to_string()));
    }

    if x.len() != y.len() {
        return Err(StreamError::Fit(format!(
            "Feature rows ({}) and targets ({}) differ in length", x.len(), y.len()
        )));
    }

    let n_features = x[0].len();
    if n_features == 0 {
        return Err(StreamError::Fit("No feature columns".to_string()));
    }

    for (i, row) in x.iter().enumerate() {
        if row.len() != n_features {
            return Err(StreamError::Fit(format!(
                "Row {} has {} features, expected {}", i, row.len(), n_features
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(StreamError::Fit(format!("Row {} has a non-finite feature", i)));
        }
    }

    if y.iter().any(|v| !v.is_finite()) {
        return Err(StreamError::Fit("Target has non-finite values".to_string()));
    }

    Ok(n_features)
}

fn check_prediction_row(row: &[f64], n_features: usize) -> StreamResult<()> {
    if row.len() != n_features {
        return Err(StreamError::Fit(format!(
            "Prediction row has {} features, model was fitted on {}", row.len(), n_features
        )));
    }
    Ok(())
}
