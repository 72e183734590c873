//! Type definitions for transaction analysis

pub mod insight;
pub mod transaction;

pub use insight::{
    AnalysisReport, AnomalyRecord, ForecastPoint, FraudFlag, SegmentedRecord, SpendForecast,
};
pub use transaction::{PaymentMethod, Transaction, TxnType};
