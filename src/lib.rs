//! Transaction Insights Library
//!
//! Batch analytics over a table of payment transactions: isolation-forest
//! anomaly detection, k-means user segmentation, rule-based fraud flags and a
//! linear spend forecast, plus the dashboard aggregates and CSV reports built
//! from them.

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod feature_extractor;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod rules;
pub mod summary;
pub mod types;

pub use analysis::TransactionAnalyzer;
pub use config::AppConfig;
pub use error::{AnalysisError, Result};
pub use feature_extractor::FeatureExtractor;
pub use summary::DashboardSummary;
pub use types::{insight::AnalysisReport, transaction::Transaction};
