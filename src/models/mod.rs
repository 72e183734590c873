//! Unsupervised and regression models used by the analyses

pub mod isolation_forest;
pub mod kmeans;
pub mod matrix;
pub mod regression;

pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use kmeans::{KMeans, KMeansParams};
pub use matrix::DataMatrix;
pub use regression::LinearTrend;
