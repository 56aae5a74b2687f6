//! Evaluation metrics for CTR predictions.
//!
//! Metrics are selected by name (`"binary_crossentropy"`/`"logloss"`,
//! `"auc"`, `"mse"`, `"accuracy"`/`"acc"`) and computed in `f64` over
//! labels and predictions of equal length.

use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, Result};

const LOGLOSS_EPS: f64 = 1e-7;

/// A named evaluation metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Mean binary cross-entropy with clipped predictions
    LogLoss,
    /// Area under the ROC curve
    Auc,
    /// Mean squared error
    Mse,
    /// Fraction of predictions on the right side of 0.5
    Accuracy,
}

impl Metric {
    /// Returns the canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::LogLoss => "logloss",
            Metric::Auc => "auc",
            Metric::Mse => "mse",
            Metric::Accuracy => "accuracy",
        }
    }

    /// Scores `y_pred` against `y_true`.
    pub fn compute(&self, y_true: &[f32], y_pred: &[f32]) -> Result<f64> {
        check_lengths(y_true, y_pred)?;
        match self {
            Metric::LogLoss => Ok(log_loss(y_true, y_pred)),
            Metric::Auc => roc_auc(y_true, y_pred),
            Metric::Mse => Ok(mean_squared_error(y_true, y_pred)),
            Metric::Accuracy => Ok(accuracy(y_true, y_pred)),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binary_crossentropy" | "logloss" => Ok(Metric::LogLoss),
            "auc" => Ok(Metric::Auc),
            "mse" => Ok(Metric::Mse),
            "accuracy" | "acc" => Ok(Metric::Accuracy),
            other => Err(ModelError::MetricError {
                message: format!("unknown metric '{}'", other),
            }),
        }
    }
}

/// Parses `name` and computes the metric.
pub fn compute(name: &str, y_true: &[f32], y_pred: &[f32]) -> Result<f64> {
    name.parse::<Metric>()?.compute(y_true, y_pred)
}

fn check_lengths(y_true: &[f32], y_pred: &[f32]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::MetricError {
            message: format!(
                "got {} labels and {} predictions",
                y_true.len(),
                y_pred.len()
            ),
        });
    }
    if y_true.is_empty() {
        return Err(ModelError::MetricError {
            message: "cannot score an empty batch".to_string(),
        });
    }
    Ok(())
}

/// Mean binary cross-entropy; predictions are clipped to `[1e-7, 1 - 1e-7]`.
pub fn log_loss(y_true: &[f32], y_pred: &[f32]) -> f64 {
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&y, &p)| {
            let y = y as f64;
            let p = (p as f64).clamp(LOGLOSS_EPS, 1.0 - LOGLOSS_EPS);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / y_true.len().max(1) as f64
}

/// Mean squared error.
pub fn mean_squared_error(y_true: &[f32], y_pred: &[f32]) -> f64 {
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&y, &p)| (y as f64 - p as f64).powi(2))
        .sum();
    total / y_true.len().max(1) as f64
}

/// Accuracy with a 0.5 decision threshold.
pub fn accuracy(y_true: &[f32], y_pred: &[f32]) -> f64 {
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|&(&y, &p)| (y >= 0.5) == (p >= 0.5))
        .count();
    correct as f64 / y_true.len().max(1) as f64
}

/// Rank-based ROC AUC; tied scores share their average rank.
///
/// # Errors
///
/// Returns an error when the labels contain a single class
pub fn roc_auc(y_true: &[f32], y_pred: &[f32]) -> Result<f64> {
    let positives = y_true.iter().filter(|&&y| y >= 0.5).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(ModelError::MetricError {
            message: "auc is undefined when only one class is present".to_string(),
        });
    }

    let mut order: Vec<usize> = (0..y_pred.len()).collect();
    order.sort_by(|&a, &b| y_pred[a].total_cmp(&y_pred[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_pred[order[j + 1]] == y_pred[order[i]] {
            j += 1;
        }
        // ranks are 1-based; the tie group i..=j shares the mean rank
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += order[i..=j]
            .iter()
            .filter(|&&k| y_true[k] >= 0.5)
            .count() as f64
            * avg_rank;
        i = j + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Ok((rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_auc_perfect_and_inverted() {
        let y = [0.0, 0.0, 1.0, 1.0];
        assert_relative_eq!(roc_auc(&y, &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0);
        assert_relative_eq!(roc_auc(&y, &[0.9, 0.8, 0.2, 0.1]).unwrap(), 0.0);
    }

    #[test]
    fn test_auc_with_ties() {
        // pairs (pos, neg): (0.4 vs 0.1) win, (0.4 vs 0.4) tie, (0.35 vs 0.1) win,
        // (0.35 vs 0.4) loss -> (2 + 0.5) / 4
        let y = [0.0, 0.0, 1.0, 1.0];
        let p = [0.1, 0.4, 0.35, 0.4];
        assert_relative_eq!(roc_auc(&y, &p).unwrap(), 0.625);
    }

    #[test]
    fn test_auc_single_class() {
        assert!(roc_auc(&[1.0, 1.0], &[0.2, 0.3]).is_err());
    }

    #[test]
    fn test_log_loss() {
        let loss = log_loss(&[1.0, 0.0], &[0.9, 0.2]);
        let expected = -(0.9f64.ln() + 0.8f64.ln()) / 2.0;
        assert_relative_eq!(loss, expected, epsilon = 1e-6);

        // clipped, so certainty on the wrong side stays finite
        assert!(log_loss(&[1.0], &[0.0]).is_finite());
    }

    #[test]
    fn test_mse_and_accuracy() {
        assert_relative_eq!(mean_squared_error(&[1.0, 0.0], &[0.5, 0.5]), 0.25);
        assert_relative_eq!(accuracy(&[1.0, 0.0, 1.0], &[0.7, 0.6, 0.2]), 1.0 / 3.0);
    }

    #[test]
    fn test_compute_by_name() {
        assert_eq!("binary_crossentropy".parse::<Metric>().unwrap(), Metric::LogLoss);
        assert_eq!("acc".parse::<Metric>().unwrap(), Metric::Accuracy);
        assert!(compute("f1", &[1.0], &[1.0]).is_err());
        assert!(compute("mse", &[1.0], &[1.0, 0.0]).is_err());
        assert!(compute("mse", &[], &[]).is_err());
        assert_relative_eq!(compute("mse", &[1.0], &[0.0]).unwrap(), 1.0);
    }
}
