//! Ordinary least-squares trend line.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Number of (x, y) points the line was fitted on.
    pub n_points: usize,
}

impl LinearTrend {
    /// Fit a line through `(x, y)` points.
    ///
    /// Needs at least two distinct `x` values.
    pub fn fit(points: &[(f64, f64)]) -> Result<Self> {
        if points.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let n = points.len() as f64;
        let x_mean = points.iter().map(|p| p.0).sum::<f64>() / n;
        let y_mean = points.iter().map(|p| p.1).sum::<f64>() / n;

        let mut num = 0.0;
        let mut den = 0.0;
        for &(x, y) in points {
            num += (x - x_mean) * (y - y_mean);
            den += (x - x_mean) * (x - x_mean);
        }

        if den.abs() < 1e-12 {
            return Err(AnalysisError::InsufficientData(format!(
                "need at least 2 distinct x values, got {} point(s) at x = {}",
                points.len(),
                x_mean
            )));
        }

        let slope = num / den;
        let intercept = y_mean - slope * x_mean;

        let ss_tot: f64 = points.iter().map(|p| (p.1 - y_mean).powi(2)).sum();
        let ss_res: f64 = points
            .iter()
            .map(|p| (p.1 - (slope * p.0 + intercept)).powi(2))
            .sum();
        let r_squared = if ss_tot > f64::EPSILON {
            1.0 - ss_res / ss_tot
        } else {
            1.0
        };

        Ok(Self {
            slope,
            intercept,
            r_squared,
            n_points: points.len(),
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}
