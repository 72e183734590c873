//! Dense row-major feature matrix shared by the models.

/// Each row is a sample, each column a feature.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    data: Vec<f64>,
    n_samples: usize,
    n_features: usize,
}

impl DataMatrix {
    /// Create a matrix from flat row-major data.
    ///
    /// Panics if `data.len() != n_samples * n_features`.
    pub fn new(data: Vec<f64>, n_samples: usize, n_features: usize) -> Self {
        assert_eq!(data.len(), n_samples * n_features);
        Self {
            data,
            n_samples,
            n_features,
        }
    }

    pub fn zeros(n_samples: usize, n_features: usize) -> Self {
        Self::new(vec![0.0; n_samples * n_features], n_samples, n_features)
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples == 0
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let start = idx * self.n_features;
        &self.data[start..start + self.n_features]
    }

    pub fn row_mut(&mut self, idx: usize) -> &mut [f64] {
        let start = idx * self.n_features;
        let end = start + self.n_features;
        &mut self.data[start..end]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_features + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_samples).map(move |i| self.row(i))
    }
}

/// Squared Euclidean distance.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_access() {
        let mut m = DataMatrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2);

        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.get(2, 0), 5.0);

        m.row_mut(0)[1] = 9.0;
        assert_eq!(m.row(0), &[1.0, 9.0]);
        assert_eq!(m.rows().count(), 3);
    }

    #[test]
    fn test_squared_distance() {
        assert_eq!(squared_distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }
}
