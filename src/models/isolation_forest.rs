//! Seeded isolation forest for batch outlier scoring.
//!
//! Points that are isolated in few random splits are anomalous. The forest is
//! built once over a full feature matrix. The contamination rate sets the
//! decision offset: that share of the training rows end up with a negative
//! decision value.

use crate::error::{AnalysisError, Result};
use crate::models::matrix::DataMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation forest hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationForestParams {
    /// Number of trees in the forest.
    pub n_trees: usize,
    /// Maximum rows drawn (without replacement) per tree.
    pub max_samples: usize,
    /// Expected share of outliers, in (0, 0.5].
    pub contamination: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.01,
            seed: 42,
        }
    }
}

impl IsolationForestParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(AnalysisError::InvalidParameter(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.n_trees == 0 || self.max_samples == 0 {
            return Err(AnalysisError::InvalidParameter(
                "n_trees and max_samples must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum INode {
    Internal {
        split_feature: usize,
        split_value: f64,
        left: Box<INode>,
        right: Box<INode>,
    },
    External {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct ITree {
    root: INode,
}

impl ITree {
    fn build(data: &DataMatrix, rows: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: Self::build_node(data, rows, 0, max_depth, rng),
        }
    }

    fn build_node(
        data: &DataMatrix,
        rows: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> INode {
        if rows.len() <= 1 || depth >= max_depth {
            return INode::External { size: rows.len() };
        }

        // Only features that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..data.n_features())
            .filter_map(|feature| {
                let (min, max) = rows.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &r| {
                        let v = data.get(r, feature);
                        (lo.min(v), hi.max(v))
                    },
                );
                (max > min).then_some((feature, min, max))
            })
            .collect();

        if candidates.is_empty() {
            return INode::External { size: rows.len() };
        }

        let (feature, min_val, max_val) = candidates[rng.gen_range(0..candidates.len())];
        let split_value = rng.gen_range(min_val..max_val);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| data.get(r, feature) < split_value);

        INode::Internal {
            split_feature: feature,
            split_value,
            left: Box::new(Self::build_node(data, left_rows, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(data, right_rows, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                INode::External { size } => return depth as f64 + average_path_length(*size),
                INode::Internal {
                    split_feature,
                    split_value,
                    left,
                    right,
                } => {
                    node = if point[*split_feature] < *split_value {
                        left
                    } else {
                        right
                    };
                    depth += 1;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile (`q` in 0..=100) of unsorted values.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Fitted isolation forest.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<ITree>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// Build the forest on `data` and calibrate the decision offset.
    pub fn fit(data: &DataMatrix, params: &IsolationForestParams) -> Result<Self> {
        params.validate()?;
        if data.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let n = data.n_samples();
        let sample_size = params.max_samples.min(n);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_trees)
            .map(|_| {
                let rows = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
                ITree::build(data, rows, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: 0.0,
        };

        let scores = forest.score_samples(data);
        forest.offset = percentile(&scores, 100.0 * params.contamination);

        debug!(
            trees = params.n_trees,
            sample_size,
            max_depth,
            offset = forest.offset,
            "Isolation forest fitted"
        );

        Ok(forest)
    }

    /// Raw scores in [-1, 0): the opposite of the classic anomaly score,
    /// so lower means more anomalous.
    pub fn score_samples(&self, data: &DataMatrix) -> Vec<f64> {
        let c_n = average_path_length(self.sample_size).max(f64::EPSILON);
        data.rows()
            .map(|point| {
                let avg_path = self.trees.iter().map(|t| t.path_length(point)).sum::<f64>()
                    / self.trees.len() as f64;
                -(2.0_f64).powf(-avg_path / c_n)
            })
            .collect()
    }

    /// Scores shifted by the contamination offset; negative = outlier.
    pub fn decision_function(&self, data: &DataMatrix) -> Vec<f64> {
        self.score_samples(data)
            .into_iter()
            .map(|s| s - self.offset)
            .collect()
    }

    /// `true` for rows classified as outliers.
    pub fn predict(&self, data: &DataMatrix) -> Vec<bool> {
        self.decision_function(data)
            .into_iter()
            .map(|d| d < 0.0)
            .collect()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(contamination: f64) -> IsolationForestParams {
        IsolationForestParams {
            contamination,
            ..Default::default()
        }
    }

    fn uniform_with_outlier(n: usize) -> DataMatrix {
        let mut rng = StdRng::seed_from_u64(7);
        let mut data: Vec<f64> = (0..(n - 1) * 2).map(|_| rng.gen_range(0.0..1.0)).collect();
        data.extend_from_slice(&[25.0, -25.0]);
        DataMatrix::new(data, n, 2)
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!((average_path_length(256) - 10.2448).abs() < 1e-3);
    }

    #[test]
    fn test_percentile_interpolation() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_outlier_scores_lowest() {
        let data = uniform_with_outlier(200);
        let forest = IsolationForest::fit(&data, &params(0.01)).unwrap();

        let scores = forest.score_samples(&data);
        let min_idx = scores
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();

        assert_eq!(min_idx, 199);
        assert!(forest.predict(&data)[199]);
    }

    #[test]
    fn test_contamination_controls_flag_count() {
        let data = uniform_with_outlier(500);
        let forest = IsolationForest::fit(&data, &params(0.05)).unwrap();

        let flagged = forest.predict(&data).iter().filter(|&&f| f).count();
        assert!((20..=30).contains(&flagged), "flagged {}", flagged);
    }

    #[test]
    fn test_seeded_fit_is_deterministic() {
        let data = uniform_with_outlier(100);
        let a = IsolationForest::fit(&data, &params(0.01)).unwrap();
        let b = IsolationForest::fit(&data, &params(0.01)).unwrap();

        assert_eq!(a.decision_function(&data), b.decision_function(&data));
    }

    #[test]
    fn test_identical_rows_flag_nothing() {
        let data = DataMatrix::new(vec![1.0; 20], 10, 2);
        let forest = IsolationForest::fit(&data, &params(0.01)).unwrap();

        assert!(forest.predict(&data).iter().all(|&f| !f));
    }

    #[test]
    fn test_invalid_contamination() {
        let data = uniform_with_outlier(10);
        assert!(matches!(
            IsolationForest::fit(&data, &params(0.0)),
            Err(AnalysisError::InvalidParameter(_))
        ));
        assert!(matches!(
            IsolationForest::fit(&data, &params(0.7)),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }
}
