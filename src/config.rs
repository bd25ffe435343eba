use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{ForecastError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub horizon: usize,          // Days forecast per stream
    pub los: LosConfig,
    pub resources: ResourceConfig,
    pub departments: DepartmentConfig,
    pub worker_threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LosConfig {
    pub n_trees: usize,
    pub seed: u64,
    pub min_samples_split: usize,
    pub negative_los: NegativeLosPolicy,
}

/// What to do with stays whose discharge precedes admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeLosPolicy {
    PassThrough,
    Clamp,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub fallback_ratio: f64,     // Staff per bed when history gives no usable ratio
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartmentConfig {
    pub min_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            horizon: 30,
            los: LosConfig::default(),
            resources: ResourceConfig::default(),
            departments: DepartmentConfig::default(),
            worker_threads: None,
        }
    }
}

impl Default for LosConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            min_samples_split: 2,
            negative_los: NegativeLosPolicy::PassThrough,
        }
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self { fallback_ratio: 0.5 }
    }
}

impl Default for DepartmentConfig {
    fn default() -> Self {
        Self { min_rows: 1 }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.horizon == 0 {
            return Err(ForecastError::Config(
                "Forecast horizon must be at least one day".to_string()
            ));
        }

        self.validate_los()?;

        let ratio = self.resources.fallback_ratio;
        if !ratio.is_finite() || ratio < 0.0 {
            return Err(ForecastError::Config(
                format!("Fallback staff ratio must be a non-negative number, got {}", ratio)
            ));
        }

        if self.departments.min_rows == 0 {
            return Err(ForecastError::Config(
                "Department minimum row count must be at least 1".to_string()
            ));
        }

        if self.worker_threads == Some(0) {
            return Err(ForecastError::Config(
                "Worker thread count must be positive when set".to_string()
            ));
        }

        Ok(())
    }

    fn validate_los(&self) -> AppResult<()> {
        if self.los.n_trees == 0 {
            return Err(ForecastError::Config(
                "LOS forest needs at least one tree".to_string()
            ));
        }

        if self.los.min_samples_split < 2 {
            return Err(ForecastError::Config(
                "LOS min_samples_split must be at least 2".to_string()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.horizon, 30);
        assert_eq!(config.los.n_trees, 100);
        assert_eq!(config.los.seed, 42);
        assert_eq!(config.los.negative_los, NegativeLosPolicy::PassThrough);
        assert_eq!(config.resources.fallback_ratio, 0.5);
        assert_eq!(config.departments.min_rows, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config: Config = serde_json::from_str(
            r#"{"horizon": 14, "los": {"negative_los": "clamp"}}"#
        ).unwrap();
        assert_eq!(config.horizon, 14);
        assert_eq!(config.los.negative_los, NegativeLosPolicy::Clamp);
        assert_eq!(config.los.n_trees, 100);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.horizon = 0;
        assert!(matches!(config.validate(), Err(ForecastError::Config(_))));

        let mut config = Config::default();
        config.resources.fallback_ratio = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.los.min_samples_split = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.departments.min_rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"resources": {"fallback_ratio": 0.25}}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.resources.fallback_ratio, 0.25);
    }
}
