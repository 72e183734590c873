//! Feature preparation for the unsupervised models.
//!
//! Turns transactions into a numeric matrix: four standard-scaled numeric
//! columns (amount, day of week, month, hour) followed by one-hot blocks for
//! merchant, city, transaction type and payment method. The extractor is fit
//! per analysis and dropped with it; nothing is cached between calls.

use crate::error::{AnalysisError, Result};
use crate::models::matrix::DataMatrix;
use crate::types::transaction::Transaction;
use std::collections::BTreeSet;

const NUMERIC_COLUMNS: [&str; 4] = ["amount", "day_of_week", "month", "hour"];
const CATEGORICAL_COLUMNS: [&str; 4] = ["merchant", "city", "txn_type", "payment_method"];

fn numeric_values(tx: &Transaction) -> [f64; 4] {
    [
        tx.amount,
        tx.day_of_week() as f64,
        tx.month() as f64,
        tx.hour as f64,
    ]
}

fn categorical_values(tx: &Transaction) -> [&str; 4] {
    [
        tx.merchant.as_str(),
        tx.city.as_str(),
        tx.txn_type.as_str(),
        tx.payment_method.as_str(),
    ]
}

/// Zero-mean / unit-variance scaling for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StandardScaler {
    mean: f64,
    scale: f64,
}

impl StandardScaler {
    fn fit(values: impl Iterator<Item = f64> + Clone) -> Self {
        let n = values.clone().count() as f64;
        let mean = values.clone().sum::<f64>() / n;
        let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        // constant columns scale to all zeros
        let scale = if std > f64::EPSILON { std } else { 1.0 };
        Self { mean, scale }
    }

    fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// Fitted preprocessing: scalers plus sorted category vocabularies.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureExtractor {
    scalers: [StandardScaler; 4],
    vocabularies: [Vec<String>; 4],
}

impl FeatureExtractor {
    /// Learn scaling statistics and category vocabularies.
    pub fn fit(transactions: &[Transaction]) -> Result<Self> {
        if transactions.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let scalers = std::array::from_fn(|col| {
            StandardScaler::fit(transactions.iter().map(move |tx| numeric_values(tx)[col]))
        });

        let vocabularies = std::array::from_fn(|col| {
            transactions
                .iter()
                .map(|tx| categorical_values(tx)[col].to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        });

        Ok(Self {
            scalers,
            vocabularies,
        })
    }

    /// Fit on `transactions` and encode the same rows.
    pub fn fit_transform(transactions: &[Transaction]) -> Result<(Self, DataMatrix)> {
        let extractor = Self::fit(transactions)?;
        let matrix = extractor.transform(transactions);
        Ok((extractor, matrix))
    }

    /// Encode transactions with the fitted statistics.
    ///
    /// Categories not seen during `fit` encode as an all-zero block.
    pub fn transform(&self, transactions: &[Transaction]) -> DataMatrix {
        let n_features = self.feature_count();
        let mut matrix = DataMatrix::zeros(transactions.len(), n_features);

        for (i, tx) in transactions.iter().enumerate() {
            self.encode_into(tx, matrix.row_mut(i));
        }

        matrix
    }

    /// Encode a single transaction.
    pub fn extract(&self, tx: &Transaction) -> Vec<f64> {
        let mut features = vec![0.0; self.feature_count()];
        self.encode_into(tx, &mut features);
        features
    }

    fn encode_into(&self, tx: &Transaction, out: &mut [f64]) {
        let numeric = numeric_values(tx);
        for (col, scaler) in self.scalers.iter().enumerate() {
            out[col] = scaler.apply(numeric[col]);
        }

        let mut offset = NUMERIC_COLUMNS.len();
        for (value, vocabulary) in categorical_values(tx).iter().zip(self.vocabularies.iter()) {
            if let Ok(idx) = vocabulary.binary_search_by(|v| v.as_str().cmp(value)) {
                out[offset + idx] = 1.0;
            }
            offset += vocabulary.len();
        }
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        NUMERIC_COLUMNS.len() + self.vocabularies.iter().map(Vec::len).sum::<usize>()
    }

    /// Get feature names in column order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        for (column, vocabulary) in CATEGORICAL_COLUMNS.iter().zip(self.vocabularies.iter()) {
            names.extend(vocabulary.iter().map(|v| format!("{}_{}", column, v)));
        }
        names
    }
}
