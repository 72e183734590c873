//! Analysis output structures

use crate::error::{AnalysisError, Result};
use crate::models::regression::LinearTrend;
use crate::types::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// A transaction flagged by the isolation forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    #[serde(flatten)]
    pub transaction: Transaction,

    /// Decision value (lower = more anomalous, negative = outlier)
    pub anomaly_score: f64,

    pub is_anomaly: bool,
}

/// A transaction with its cluster label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedRecord {
    #[serde(flatten)]
    pub transaction: Transaction,

    /// Cluster label in `0..n_clusters`; not stable across different inputs
    pub segment: usize,
}

/// A transaction caught by at least one fraud rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudFlag {
    #[serde(flatten)]
    pub transaction: Transaction,

    /// Names of the rules that fired
    pub rules: Vec<String>,
}

/// Predicted spend for one day of the year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub day_of_year: u32,
    pub predicted_spend: f64,
}

/// Fitted trend plus its evaluation over the configured horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendForecast {
    pub model: LinearTrend,
    pub points: Vec<ForecastPoint>,
}

/// Outcome of all four analyses over one dataset.
///
/// Each analysis keeps its own `Result` so one failure never hides the others.
#[derive(Debug)]
pub struct AnalysisReport {
    pub rows: usize,
    pub anomalies: Result<Vec<AnomalyRecord>>,
    pub segments: Result<Vec<SegmentedRecord>>,
    pub fraud_flags: Result<Vec<FraudFlag>>,
    pub forecast: Result<SpendForecast>,
}

impl AnalysisReport {
    /// Number of analyses that failed
    pub fn failure_count(&self) -> usize {
        [
            self.anomalies.is_err(),
            self.segments.is_err(),
            self.fraud_flags.is_err(),
            self.forecast.is_err(),
        ]
        .iter()
        .filter(|&&failed| failed)
        .count()
    }

    /// Borrow the report in a serializable shape
    pub fn view(&self) -> ReportView<'_> {
        ReportView {
            rows: self.rows,
            anomalies: Section::from_result(&self.anomalies),
            segments: Section::from_result(&self.segments),
            fraud_flags: Section::from_result(&self.fraud_flags),
            forecast: Section::from_result(&self.forecast),
        }
    }
}

/// Serializable projection of an [`AnalysisReport`]
#[derive(Debug, Serialize)]
pub struct ReportView<'a> {
    pub rows: usize,
    pub anomalies: Section<'a, Vec<AnomalyRecord>>,
    pub segments: Section<'a, Vec<SegmentedRecord>>,
    pub fraud_flags: Section<'a, Vec<FraudFlag>>,
    pub forecast: Section<'a, SpendForecast>,
}

/// One analysis outcome as it appears in the JSON report
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Section<'a, T: Serialize> {
    Ok { data: &'a T },
    Failed { error: String },
}

impl<'a, T: Serialize> Section<'a, T> {
    fn from_result(result: &'a std::result::Result<T, AnalysisError>) -> Self {
        match result {
            Ok(data) => Section::Ok { data },
            Err(e) => Section::Failed {
                error: e.to_string(),
            },
        }
    }
}
