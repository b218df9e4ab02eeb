use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{debug, warn};

use crate::{Error, Evaluation, InputRecord, OutputRecord};

/// Degrees of freedom left after estimating the row's parameters.
pub fn degrees_of_freedom(record: &InputRecord) -> Result<u64, Error> {
    let parameters = record.num_parameters()?;
    if record.sample_size <= parameters {
        return Err(Error::InsufficientSamples {
            sample_size: record.sample_size,
            parameters,
        });
    }
    Ok(record.sample_size - parameters)
}

/// Test one coefficient against the null hypothesis that it is zero.
///
/// The p-value is the two-tailed probability of a t-statistic at least as
/// extreme as `coefficient / std_error` under Student's t-distribution with
/// `sample_size - k` degrees of freedom. The confidence interval is the
/// (1 - significant_level) interval around the coefficient.
pub fn evaluate(record: &InputRecord) -> Result<Evaluation, Error> {
    record.validate()?;
    let degrees_of_freedom = degrees_of_freedom(record)?;
    let t_statistic = record.coefficient / record.std_error;
    let t_distr = StudentsT::new(0.0, 1.0, degrees_of_freedom as f64)
        .map_err(|e| Error::InvalidParameter(e.to_string()))?;
    // clamp absorbs floating-point overshoot in the CDF tails
    let p_value = (2.0 * (1.0 - t_distr.cdf(t_statistic.abs()))).clamp(0.0, 1.0);
    let t_critical = t_distr.inverse_cdf(1.0 - record.significant_level / 2.0);
    let margin_of_error = t_critical * record.std_error;
    Ok(Evaluation {
        t_statistic,
        degrees_of_freedom,
        p_value,
        is_significant: p_value < record.significant_level,
        ci_lower: record.coefficient - margin_of_error,
        ci_upper: record.coefficient + margin_of_error,
        margin_of_error,
    })
}

/// Evaluate a batch of rows in input order. A row that fails validation
/// becomes an error entry; it never aborts the rest of the batch.
pub fn evaluate_batch(records: Vec<InputRecord>) -> Vec<OutputRecord> {
    debug!("Evaluating {} records", records.len());
    records
        .into_iter()
        .enumerate()
        .map(|(i, input)| {
            let evaluation = evaluate(&input);
            if let Err(e) = &evaluation {
                warn!("row {} failed: {}", i + 1, e);
            }
            OutputRecord { input, evaluation }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub evaluated: usize,
    pub failed: usize,
    pub significant: usize,
    pub min_p_value: Option<f64>,
    pub max_p_value: Option<f64>,
    pub mean_p_value: Option<f64>,
}

pub fn summarize(records: &[OutputRecord]) -> BatchSummary {
    let mut evaluated = 0;
    let mut significant = 0;
    let mut min_p = f64::INFINITY;
    let mut max_p = f64::NEG_INFINITY;
    let mut sum_p = 0.0;
    for record in records {
        if let Ok(evaluation) = &record.evaluation {
            evaluated += 1;
            if evaluation.is_significant {
                significant += 1;
            }
            min_p = min_p.min(evaluation.p_value);
            max_p = max_p.max(evaluation.p_value);
            sum_p += evaluation.p_value;
        }
    }
    BatchSummary {
        total: records.len(),
        evaluated,
        failed: records.len() - evaluated,
        significant,
        min_p_value: (evaluated > 0).then_some(min_p),
        max_p_value: (evaluated > 0).then_some(max_p),
        mean_p_value: (evaluated > 0).then(|| sum_p / evaluated as f64),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::RegressionType;

    macro_rules! assert_float_eq {
        ($a:expr, $b:expr, $tol:expr) => {
            assert!(($a - $b).abs() < $tol, "{} != {}", $a, $b);
        };
    }

    fn record(coefficient: f64, std_error: f64, sample_size: u64) -> InputRecord {
        InputRecord {
            coefficient,
            std_error,
            sample_size,
            significant_level: 0.05,
            regression_type: RegressionType::Simple,
            num_predictors: None,
        }
    }

    #[test]
    fn test_degrees_of_freedom_simple() {
        assert_eq!(degrees_of_freedom(&record(1.0, 1.0, 30)).unwrap(), 28);
    }

    #[test]
    fn test_degrees_of_freedom_multiple() {
        let mut r = record(1.0, 1.0, 50);
        r.regression_type = RegressionType::Multiple;
        r.num_predictors = Some(3);
        assert_eq!(degrees_of_freedom(&r).unwrap(), 46);
    }

    #[test]
    fn test_degrees_of_freedom_simple_with_explicit_predictors() {
        let mut r = record(1.0, 1.0, 30);
        r.num_predictors = Some(3);
        assert_eq!(degrees_of_freedom(&r).unwrap(), 26);
    }

    #[test]
    fn test_degrees_of_freedom_requires_predictor_count() {
        let mut r = record(1.0, 1.0, 30);
        r.regression_type = RegressionType::Multiple;
        assert!(matches!(
            degrees_of_freedom(&r),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_huge_predictor_count_rejected() {
        let mut r = record(1.0, 1.0, 30);
        r.regression_type = RegressionType::Multiple;
        r.num_predictors = Some(u64::MAX);
        assert!(matches!(
            degrees_of_freedom(&r),
            Err(Error::InsufficientSamples { .. })
        ));
        assert!(matches!(
            evaluate(&r),
            Err(Error::InsufficientSamples { .. })
        ));
        // a failing row stays a per-row error in a batch
        let results = evaluate_batch(vec![r, record(2.0, 0.5, 30)]);
        assert!(results[0].evaluation.is_err());
        assert!(results[1].evaluation.is_ok());
    }

    #[test]
    fn test_significant_coefficient() {
        let evaluation = evaluate(&record(2.0, 0.5, 30)).unwrap();
        assert_float_eq!(evaluation.t_statistic, 4.0, 1e-12);
        assert_eq!(evaluation.degrees_of_freedom, 28);
        assert_float_eq!(evaluation.p_value, 0.00042, 5e-5);
        assert!(evaluation.is_significant);
    }

    #[test]
    fn test_confidence_interval() {
        // t_crit(0.975, 28) = 2.048407
        let evaluation = evaluate(&record(2.0, 0.5, 30)).unwrap();
        assert_float_eq!(evaluation.margin_of_error, 1.0242035, 1e-4);
        assert_float_eq!(evaluation.ci_lower, 2.0 - 1.0242035, 1e-4);
        assert_float_eq!(evaluation.ci_upper, 2.0 + 1.0242035, 1e-4);
        assert!(evaluation.ci_lower < 2.0 && 2.0 < evaluation.ci_upper);
    }

    #[test]
    fn test_two_tailed_symmetry() {
        let pos = evaluate(&record(1.7, 0.4, 25)).unwrap();
        let neg = evaluate(&record(-1.7, 0.4, 25)).unwrap();
        assert_eq!(pos.p_value, neg.p_value);
        assert_eq!(pos.is_significant, neg.is_significant);
        assert_float_eq!(pos.t_statistic, -neg.t_statistic, 1e-12);
    }

    #[test]
    fn test_p_value_monotone_in_t() {
        let mut last = f64::INFINITY;
        for t in [0.5, 1.0, 2.0, 3.0, 5.0] {
            let p = evaluate(&record(t, 1.0, 20)).unwrap().p_value;
            assert!(p < last, "p-value not decreasing at t = {t}");
            last = p;
        }
    }

    #[test]
    fn test_p_value_boundaries() {
        let zero = evaluate(&record(0.0, 1.0, 20)).unwrap();
        assert_float_eq!(zero.t_statistic, 0.0, 1e-12);
        assert_float_eq!(zero.p_value, 1.0, 1e-12);
        assert!(!zero.is_significant);
        let huge = evaluate(&record(1e6, 1.0, 20)).unwrap();
        assert!(huge.p_value >= 0.0 && huge.p_value < 1e-12);
    }

    #[test]
    fn test_p_value_in_range() {
        for n in [3, 5, 10, 100, 10_000] {
            for t in [0.0, 0.1, 1.0, 2.5, 10.0, 1e3] {
                let p = evaluate(&record(t, 1.0, n)).unwrap().p_value;
                assert!((0.0..=1.0).contains(&p), "p = {p} for t = {t}, n = {n}");
            }
        }
    }

    #[test]
    fn test_insufficient_samples() {
        let mut r = record(1.0, 1.0, 2);
        r.regression_type = RegressionType::Multiple;
        r.num_predictors = Some(5);
        assert!(matches!(
            evaluate(&r),
            Err(Error::InsufficientSamples {
                sample_size: 2,
                parameters: 6,
            })
        ));
        // n = k leaves zero degrees of freedom, also rejected
        assert!(matches!(
            evaluate(&record(1.0, 1.0, 2)),
            Err(Error::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn test_zero_std_error_rejected() {
        assert!(matches!(
            evaluate(&record(1.0, 0.0, 30)),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_batch_preserves_order_and_count() {
        let rows = vec![
            record(2.0, 0.5, 30),
            record(1.0, 0.0, 30),
            record(-0.3, 0.9, 12),
        ];
        let results = evaluate_batch(rows.clone());
        assert_eq!(results.len(), rows.len());
        for (result, input) in results.iter().zip(&rows) {
            assert_eq!(&result.input, input);
        }
        assert!(results[0].evaluation.is_ok());
        assert!(results[1].evaluation.is_err());
        assert!(results[2].evaluation.is_ok());
    }

    #[test]
    fn test_summarize() {
        let results = evaluate_batch(vec![
            record(2.0, 0.5, 30),
            record(1.0, 0.0, 30),
            record(-0.3, 0.9, 12),
        ]);
        let summary = summarize(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.significant, 1);
        let min = summary.min_p_value.unwrap();
        let max = summary.max_p_value.unwrap();
        let mean = summary.mean_p_value.unwrap();
        assert!(min <= mean && mean <= max);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert!(summary.min_p_value.is_none());
        assert!(summary.mean_p_value.is_none());
    }
}
