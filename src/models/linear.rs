use nalgebra::{DMatrix, DVector, SVD};
use super::{check_prediction_row, check_training_data, Regressor};
use crate::error::{StreamError, StreamResult};

/// Ordinary least squares with an intercept.
///
/// The intercept is handled by centering, the coefficients come from the
/// SVD pseudo-inverse. Singular values below `eps * max(n, p) * s_max` are
/// dropped, so rank-deficient or under-determined systems resolve to the
/// minimum-norm solution instead of failing.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    rank: usize,
    fitted: bool,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Effective rank of the centered design matrix.
    pub fn rank(&self) -> usize {
        self.rank
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> StreamResult<()> {
        let n_features = check_training_data(x, y)?;
        let n = x.len();

        let x_mean: Vec<f64> = (0..n_features)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n as f64)
            .collect();
        let y_mean = y.iter().sum::<f64>() / n as f64;

        let centered_x = DMatrix::from_fn(n, n_features, |i, j| x[i][j] - x_mean[j]);
        let centered_y = DVector::from_iterator(n, y.iter().map(|v| v - y_mean));

        // Iterates to nalgebra's default convergence threshold
        let svd = SVD::new(centered_x, true, true);

        let s_max = svd.singular_values.iter().cloned().fold(0.0, f64::max);
        let tolerance = f64::EPSILON * n.max(n_features) as f64 * s_max;
        self.rank = svd.singular_values.iter().filter(|&&s| s > tolerance).count();

        let solution = svd.solve(&centered_y, tolerance)
            .map_err(|e| StreamError::Fit(e.to_string()))?;

        self.coefficients = solution.iter().cloned().collect();
        self.intercept = y_mean - x_mean.iter()
            .zip(&self.coefficients)
            .map(|(m, c)| m * c)
            .sum::<f64>();
        self.fitted = true;

        Ok(())
    }

    fn predict_one(&self, row: &[f64]) -> StreamResult<f64> {
        if !self.fitted {
            return Err(StreamError::Fit("Linear model has not been fitted".to_string()));
        }
        check_prediction_row(row, self.coefficients.len())?;

        Ok(self.intercept + row.iter()
            .zip(&self.coefficients)
            .map(|(x, c)| x * c)
            .sum::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_recovers_exact_plane() {
        // y = 3 + 2*x0 - 0.5*x1
        let x: Vec<Vec<f64>> = (0..12)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 + 2.0 * r[0] - 0.5 * r[1]).collect();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.rank(), 2);
        assert_relative_eq!(model.intercept(), 3.0, epsilon = 1e-9);
        assert_relative_eq!(model.coefficients()[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(model.coefficients()[1], -0.5, epsilon = 1e-9);
        assert_relative_eq!(model.predict_one(&[20.0, 1.0]).unwrap(), 42.5, epsilon = 1e-9);
    }

    #[test]
    fn test_single_row_gives_flat_prediction() {
        let mut model = LinearRegression::new();
        model.fit(&[vec![0.0, 2.0, 14.0, 3.0]], &[17.0]).unwrap();

        assert_eq!(model.rank(), 0);
        assert!(model.coefficients().iter().all(|&c| c == 0.0));
        assert_relative_eq!(model.predict_one(&[5.0, 1.0, 20.0, 4.0]).unwrap(), 17.0);
    }

    #[test]
    fn test_collinear_columns_use_minimum_norm() {
        // Second column duplicates the first: weight is split evenly
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, i as f64]).collect();
        let y: Vec<f64> = (0..5).map(|i| 4.0 * i as f64).collect();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.rank(), 1);
        assert_relative_eq!(model.coefficients()[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(model.coefficients()[1], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = LinearRegression::new();
        assert!(model.predict_one(&[1.0]).is_err());
    }

    #[test]
    fn test_refit_is_bit_identical() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i % 7) as f64, (i % 11) as f64]).collect();
        let y: Vec<f64> = (0..30).map(|i| (i as f64).sin() * 10.0 + i as f64).collect();

        let mut a = LinearRegression::new();
        let mut b = LinearRegression::new();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.coefficients(), b.coefficients());
        assert_eq!(a.intercept().to_bits(), b.intercept().to_bits());
    }
}
