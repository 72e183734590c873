//! K-means clustering with k-means++ seeding.
//!
//! Runs Lloyd's algorithm `n_init` times from a single seeded RNG and keeps
//! the run with the lowest inertia.

use crate::error::{AnalysisError, Result};
use crate::models::matrix::{squared_distance, DataMatrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// K-means hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansParams {
    pub n_clusters: usize,
    /// Independent initializations; the best inertia wins.
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence tolerance, relative to the mean feature variance.
    pub tol: f64,
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            n_clusters: 4,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed: 42,
        }
    }
}

impl KMeansParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_clusters == 0 || self.n_init == 0 || self.max_iter == 0 {
            return Err(AnalysisError::InvalidParameter(
                "n_clusters, n_init and max_iter must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fitted k-means model.
#[derive(Debug, Clone)]
pub struct KMeans {
    centroids: DataMatrix,
    labels: Vec<usize>,
    inertia: f64,
    iterations: usize,
    converged: bool,
}

impl KMeans {
    pub fn fit(data: &DataMatrix, params: &KMeansParams) -> Result<Self> {
        params.validate()?;
        if data.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }
        if data.n_samples() < params.n_clusters {
            return Err(AnalysisError::InsufficientData(format!(
                "{} rows cannot form {} clusters",
                data.n_samples(),
                params.n_clusters
            )));
        }

        let tol = params.tol * mean_variance(data);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut best: Option<KMeans> = None;
        for run in 0..params.n_init {
            let initial = init_plus_plus(data, params.n_clusters, &mut rng);
            let candidate = lloyd(data, initial, params.max_iter, tol);

            debug!(
                run,
                inertia = candidate.inertia,
                iterations = candidate.iterations,
                "K-means run finished"
            );

            if best.as_ref().map_or(true, |b| candidate.inertia < b.inertia) {
                best = Some(candidate);
            }
        }

        best.ok_or_else(|| AnalysisError::InvalidParameter("n_init must be positive".to_string()))
    }

    /// Cluster label per training row.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Assign each row to its nearest centroid.
    pub fn predict(&self, data: &DataMatrix) -> Vec<usize> {
        data.rows().map(|p| nearest(&self.centroids, p).0).collect()
    }

    pub fn centroids(&self) -> &DataMatrix {
        &self.centroids
    }

    /// Within-cluster sum of squared distances.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

fn mean_variance(data: &DataMatrix) -> f64 {
    let n = data.n_samples() as f64;
    let d = data.n_features();
    if d == 0 {
        return 0.0;
    }
    (0..d)
        .map(|col| {
            let mean = data.rows().map(|r| r[col]).sum::<f64>() / n;
            data.rows().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n
        })
        .sum::<f64>()
        / d as f64
}

/// (index, squared distance) of the closest centroid; ties go to the lower index.
fn nearest(centroids: &DataMatrix, point: &[f64]) -> (usize, f64) {
    centroids
        .rows()
        .map(|c| squared_distance(c, point))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, d)| {
            if d < best.1 {
                (i, d)
            } else {
                best
            }
        })
}

/// k-means++: each next centre is drawn with probability proportional to its
/// squared distance from the closest centre chosen so far.
fn init_plus_plus(data: &DataMatrix, k: usize, rng: &mut StdRng) -> DataMatrix {
    let n = data.n_samples();
    let d = data.n_features();
    let mut centroids = DataMatrix::zeros(k, d);

    let first = rng.gen_range(0..n);
    centroids.row_mut(0).copy_from_slice(data.row(first));

    let mut closest: Vec<f64> = data
        .rows()
        .map(|p| squared_distance(p, data.row(first)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            closest
                .iter()
                .position(|&w| {
                    cumulative += w;
                    cumulative > target
                })
                .unwrap_or(n - 1)
        } else {
            // fewer distinct points than clusters
            rng.gen_range(0..n)
        };

        centroids.row_mut(c).copy_from_slice(data.row(chosen));
        for (i, p) in data.rows().enumerate() {
            closest[i] = closest[i].min(squared_distance(p, data.row(chosen)));
        }
    }

    centroids
}

fn lloyd(data: &DataMatrix, mut centroids: DataMatrix, max_iter: usize, tol: f64) -> KMeans {
    let k = centroids.n_samples();
    let d = centroids.n_features();
    let mut labels = vec![0usize; data.n_samples()];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        iterations += 1;

        for (i, p) in data.rows().enumerate() {
            labels[i] = nearest(&centroids, p).0;
        }

        let mut sums = DataMatrix::zeros(k, d);
        let mut counts = vec![0usize; k];
        for (i, p) in data.rows().enumerate() {
            counts[labels[i]] += 1;
            for (s, v) in sums.row_mut(labels[i]).iter_mut().zip(p) {
                *s += v;
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            // empty clusters keep their previous centre
            if counts[c] == 0 {
                continue;
            }
            let updated: Vec<f64> = sums.row(c).iter().map(|s| s / counts[c] as f64).collect();
            shift += squared_distance(centroids.row(c), &updated);
            centroids.row_mut(c).copy_from_slice(&updated);
        }

        if shift <= tol {
            converged = true;
            break;
        }
    }

    let mut inertia = 0.0;
    for (i, p) in data.rows().enumerate() {
        let (label, dist) = nearest(&centroids, p);
        labels[i] = label;
        inertia += dist;
    }

    KMeans {
        centroids,
        labels,
        inertia,
        iterations,
        converged,
    }
}
