//! Configuration management for transaction analysis

use crate::models::isolation_forest::IsolationForestParams;
use crate::models::kmeans::KMeansParams;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// How the forecast horizon is placed on the day-of-year axis
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HorizonMode {
    /// Last `days` days of a 365-day year (336..=365 for 30 days),
    /// regardless of the input's date range
    #[default]
    Fixed,
    /// The `days` days following the latest day-of-year present in the input
    FollowData,
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisSettings,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Settings for the four analyses
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    pub anomaly: IsolationForestParams,
    pub segmentation: KMeansParams,
    pub fraud_rules: FraudRuleSettings,
    pub forecast: ForecastSettings,
}

/// Rule-based fraud filter configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FraudRuleSettings {
    /// Amounts strictly above this are flagged
    pub amount_threshold: f64,
    /// Per-user burst detection; disabled unless configured
    pub velocity: Option<VelocitySettings>,
}

impl Default for FraudRuleSettings {
    fn default() -> Self {
        Self {
            amount_threshold: 4000.0,
            velocity: None,
        }
    }
}

/// Flag users with more than `max_transactions` inside `window_days` calendar days
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct VelocitySettings {
    pub max_transactions: usize,
    pub window_days: i64,
}

/// Spend forecast configuration
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForecastSettings {
    pub horizon: HorizonMode,
    /// Number of days to predict
    pub days: u32,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon: HorizonMode::Fixed,
            days: 30,
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for CSV reports; none written when unset
    pub report_dir: Option<String>,
    /// Pretty-print the JSON report on stdout
    pub pretty_json: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `config/config.toml`, falling back to defaults when it is absent
    pub fn load() -> Result<Self> {
        let path = Path::new("config/config.toml");
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        let analysis = &config.analysis;

        assert_eq!(analysis.anomaly.contamination, 0.01);
        assert_eq!(analysis.anomaly.seed, 42);
        assert_eq!(analysis.segmentation.n_clusters, 4);
        assert_eq!(analysis.segmentation.n_init, 10);
        assert_eq!(analysis.segmentation.seed, 42);
        assert_eq!(analysis.fraud_rules.amount_threshold, 4000.0);
        assert!(analysis.fraud_rules.velocity.is_none());
        assert_eq!(analysis.forecast.horizon, HorizonMode::Fixed);
        assert_eq!(analysis.forecast.days, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.output.report_dir.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[analysis.anomaly]
contamination = 0.05

[analysis.fraud_rules]
amount_threshold = 2500.0

[analysis.fraud_rules.velocity]
max_transactions = 3
window_days = 1

[analysis.forecast]
horizon = "follow_data"
days = 14

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();

        assert_eq!(config.analysis.anomaly.contamination, 0.05);
        // untouched keys keep their defaults
        assert_eq!(config.analysis.anomaly.seed, 42);
        assert_eq!(config.analysis.segmentation.n_clusters, 4);
        assert_eq!(config.analysis.fraud_rules.amount_threshold, 2500.0);
        assert_eq!(
            config.analysis.fraud_rules.velocity,
            Some(VelocitySettings {
                max_transactions: 3,
                window_days: 1
            })
        );
        assert_eq!(config.analysis.forecast.horizon, HorizonMode::FollowData);
        assert_eq!(config.analysis.forecast.days, 14);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }
}
