//! The four transaction analyses and the runners that combine them.
//!
//! Every operation fits its own [`FeatureExtractor`] and model as local values
//! and returns owned results. No model state survives a call.

use crate::config::{AnalysisSettings, HorizonMode};
use crate::error::{AnalysisError, Result};
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::AnalysisMetrics;
use crate::models::isolation_forest::IsolationForest;
use crate::models::kmeans::KMeans;
use crate::models::regression::LinearTrend;
use crate::rules::RuleSet;
use crate::types::insight::{
    AnalysisReport, AnomalyRecord, ForecastPoint, FraudFlag, SegmentedRecord, SpendForecast,
};
use crate::types::transaction::Transaction;
use std::collections::BTreeMap;
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs anomaly detection, segmentation, fraud rules and forecasting
pub struct TransactionAnalyzer {
    settings: AnalysisSettings,
    metrics: Arc<AnalysisMetrics>,
}

impl TransactionAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self::with_metrics(settings, Arc::new(AnalysisMetrics::new()))
    }

    pub fn with_metrics(settings: AnalysisSettings, metrics: Arc<AnalysisMetrics>) -> Self {
        Self { settings, metrics }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &Arc<AnalysisMetrics> {
        &self.metrics
    }

    /// Isolation-forest outliers only, each with its decision value.
    pub fn detect_anomalies(&self, transactions: &[Transaction]) -> Result<Vec<AnomalyRecord>> {
        let (_, features) = FeatureExtractor::fit_transform(transactions)?;
        let forest = IsolationForest::fit(&features, &self.settings.anomaly)?;
        let decisions = forest.decision_function(&features);

        let anomalies: Vec<AnomalyRecord> = transactions
            .iter()
            .zip(decisions)
            .filter(|(_, score)| *score < 0.0)
            .map(|(tx, anomaly_score)| AnomalyRecord {
                transaction: tx.clone(),
                anomaly_score,
                is_anomaly: true,
            })
            .collect();

        debug!(
            rows = transactions.len(),
            flagged = anomalies.len(),
            offset = forest.offset(),
            "Anomaly detection complete"
        );

        Ok(anomalies)
    }

    /// Every transaction with a k-means segment label.
    pub fn segment_users(&self, transactions: &[Transaction]) -> Result<Vec<SegmentedRecord>> {
        let (_, features) = FeatureExtractor::fit_transform(transactions)?;
        let model = KMeans::fit(&features, &self.settings.segmentation)?;

        debug!(
            rows = transactions.len(),
            inertia = model.inertia(),
            iterations = model.iterations(),
            converged = model.converged(),
            "Segmentation complete"
        );

        Ok(transactions
            .iter()
            .zip(model.labels())
            .map(|(tx, &segment)| SegmentedRecord {
                transaction: tx.clone(),
                segment,
            })
            .collect())
    }

    /// Rows caught by the configured fraud rules.
    pub fn detect_fraud_rules(&self, transactions: &[Transaction]) -> Result<Vec<FraudFlag>> {
        let rules = RuleSet::from_settings(&self.settings.fraud_rules);
        Ok(rules.apply(transactions))
    }

    /// OLS line of total spend per day-of-year.
    ///
    /// Amounts from different years that share a day-of-year are summed together.
    pub fn train_forecasting_model(&self, transactions: &[Transaction]) -> Result<LinearTrend> {
        if transactions.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let mut daily: BTreeMap<u32, f64> = BTreeMap::new();
        for tx in transactions {
            *daily.entry(tx.day_of_year()).or_insert(0.0) += tx.amount;
        }

        let points: Vec<(f64, f64)> = daily
            .into_iter()
            .map(|(day, total)| (day as f64, total))
            .collect();

        let trend = LinearTrend::fit(&points)?;
        debug!(
            days = points.len(),
            slope = trend.slope,
            intercept = trend.intercept,
            "Forecast model fitted"
        );
        Ok(trend)
    }

    /// Days of the year the forecast is evaluated on.
    ///
    /// In `FollowData` mode the range does not wrap at year end: days past 365
    /// extend the fitted line beyond the calendar year (361..=390 after day 360).
    pub fn forecast_horizon(&self, transactions: &[Transaction]) -> RangeInclusive<u32> {
        let days = self.settings.forecast.days.max(1);
        match self.settings.forecast.horizon {
            HorizonMode::Fixed => (366u32.saturating_sub(days)).max(1)..=365,
            HorizonMode::FollowData => {
                let last = transactions
                    .iter()
                    .map(Transaction::day_of_year)
                    .max()
                    .unwrap_or(0);
                (last + 1)..=(last + days)
            }
        }
    }

    /// Fit the trend and evaluate it over the configured horizon.
    pub fn forecast(&self, transactions: &[Transaction]) -> Result<SpendForecast> {
        let model = self.train_forecasting_model(transactions)?;
        let points = self
            .forecast_horizon(transactions)
            .map(|day| ForecastPoint {
                day_of_year: day,
                predicted_spend: model.predict(day as f64),
            })
            .collect();

        Ok(SpendForecast { model, points })
    }

    /// Run all four analyses one after another.
    pub fn run_all(&self, transactions: &[Transaction]) -> AnalysisReport {
        AnalysisReport {
            rows: transactions.len(),
            anomalies: self.timed("anomalies", || self.detect_anomalies(transactions)),
            segments: self.timed("segments", || self.segment_users(transactions)),
            fraud_flags: self.timed("fraud_rules", || self.detect_fraud_rules(transactions)),
            forecast: self.timed("forecast", || self.forecast(transactions)),
        }
    }

    /// Run all four analyses concurrently on the blocking thread pool.
    ///
    /// The tasks share only the read-only input. A panic in one task surfaces
    /// as `TaskFailed` for that analysis alone.
    pub async fn run_parallel(
        self: Arc<Self>,
        transactions: Arc<[Transaction]>,
    ) -> AnalysisReport {
        let anomalies = spawn_analysis(&self, &transactions, "anomalies", |a, t| {
            a.detect_anomalies(t)
        });
        let segments = spawn_analysis(&self, &transactions, "segments", |a, t| a.segment_users(t));
        let fraud_flags = spawn_analysis(&self, &transactions, "fraud_rules", |a, t| {
            a.detect_fraud_rules(t)
        });
        let forecast = spawn_analysis(&self, &transactions, "forecast", |a, t| a.forecast(t));

        let (anomalies, segments, fraud_flags, forecast) =
            tokio::join!(anomalies, segments, fraud_flags, forecast);

        AnalysisReport {
            rows: transactions.len(),
            anomalies,
            segments,
            fraud_flags,
            forecast,
        }
    }

    fn timed<T: OutputSize>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        match &result {
            Ok(output) => {
                self.metrics.record(name, elapsed, Some(output.output_size()));
                info!(
                    analysis = name,
                    output_rows = output.output_size(),
                    elapsed_us = elapsed.as_micros() as u64,
                    "Analysis complete"
                );
            }
            Err(e) => {
                self.metrics.record(name, elapsed, None);
                warn!(analysis = name, error = %e, "Analysis failed");
            }
        }

        result
    }
}

fn spawn_analysis<T, F>(
    analyzer: &Arc<TransactionAnalyzer>,
    transactions: &Arc<[Transaction]>,
    name: &'static str,
    f: F,
) -> impl Future<Output = Result<T>>
where
    T: OutputSize + Send + 'static,
    F: FnOnce(&TransactionAnalyzer, &[Transaction]) -> Result<T> + Send + 'static,
{
    let metrics = Arc::clone(&analyzer.metrics);
    let analyzer = Arc::clone(analyzer);
    let transactions = Arc::clone(transactions);
    let handle =
        tokio::task::spawn_blocking(move || analyzer.timed(name, || f(&analyzer, &transactions)));

    async move {
        handle.await.unwrap_or_else(|e| {
            // a panicking task never reaches `timed`
            metrics.record(name, Duration::ZERO, None);
            warn!(analysis = name, error = %e, "Analysis task did not complete");
            Err(AnalysisError::TaskFailed(format!("{}: {}", name, e)))
        })
    }
}

/// Row count reported to metrics and logs.
trait OutputSize {
    fn output_size(&self) -> usize;
}

impl<T> OutputSize for Vec<T> {
    fn output_size(&self) -> usize {
        self.len()
    }
}

impl OutputSize for SpendForecast {
    fn output_size(&self) -> usize {
        self.points.len()
    }
}
