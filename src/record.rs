use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// Which degrees-of-freedom formula applies to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressionType {
    Simple,
    Multiple,
}

impl RegressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegressionType::Simple => "simple",
            RegressionType::Multiple => "multiple",
        }
    }
}

impl fmt::Display for RegressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegressionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(RegressionType::Simple),
            "multiple" => Ok(RegressionType::Multiple),
            other => Err(Error::InvalidParameter(format!(
                "regression_type must be 'simple' or 'multiple', got '{other}'"
            ))),
        }
    }
}

impl Serialize for RegressionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegressionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One regression coefficient to test. `num_predictors` is serialized under
/// the external column name `num_preditor`, which is fixed by the file
/// format contract and must not be corrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub coefficient: f64,
    pub std_error: f64,
    pub sample_size: u64,
    pub significant_level: f64,
    pub regression_type: RegressionType,
    #[serde(rename = "num_preditor", default)]
    pub num_predictors: Option<u64>,
}

impl InputRecord {
    pub fn validate(&self) -> Result<(), Error> {
        if !self.coefficient.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "coefficient must be finite, got {}",
                self.coefficient
            )));
        }
        if !self.std_error.is_finite() || self.std_error <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "std_error must be positive, got {}",
                self.std_error
            )));
        }
        if self.sample_size < 2 {
            return Err(Error::InvalidParameter(format!(
                "sample_size must be at least 2, got {}",
                self.sample_size
            )));
        }
        if !(self.significant_level > 0.0 && self.significant_level < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "significant_level must be strictly between 0 and 1, got {}",
                self.significant_level
            )));
        }
        self.num_parameters()?;
        Ok(())
    }

    /// Number of estimated parameters k (predictors plus the intercept).
    /// A predictor count explicitly supplied on a simple-regression row
    /// is honored; multiple regression without one is an error. Saturates
    /// at `u64::MAX`, which no sample size can satisfy.
    pub fn num_parameters(&self) -> Result<u64, Error> {
        match (self.regression_type, self.num_predictors) {
            (RegressionType::Multiple, Some(np)) if np > 0 => Ok(np.saturating_add(1)),
            (RegressionType::Multiple, _) => Err(Error::InvalidParameter(
                "multiple regression requires num_preditor >= 1".to_string(),
            )),
            (RegressionType::Simple, Some(np)) if np > 0 => Ok(np.saturating_add(1)),
            _ => Ok(2),
        }
    }
}

/// The computed half of an output row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub t_statistic: f64,
    pub degrees_of_freedom: u64,
    pub p_value: f64,
    pub is_significant: bool,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub margin_of_error: f64,
}

/// One output row: the input echoed back with either its evaluation or the
/// per-row error. Rows that fail never abort the batch.
#[derive(Debug)]
pub struct OutputRecord {
    pub input: InputRecord,
    pub evaluation: Result<Evaluation, Error>,
}
