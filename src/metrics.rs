//! Timing and outcome tracking for analysis runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;

/// Metrics collector shared by every run of an analyzer
pub struct AnalysisMetrics {
    /// Analyses completed successfully
    pub succeeded: AtomicU64,
    /// Analyses that returned an error
    pub failed: AtomicU64,
    /// Per-analysis durations (in microseconds)
    durations: RwLock<BTreeMap<String, Vec<u64>>>,
    /// Per-analysis output size of the most recent success
    output_rows: RwLock<BTreeMap<String, usize>>,
}

impl AnalysisMetrics {
    pub fn new() -> Self {
        Self {
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            durations: RwLock::new(BTreeMap::new()),
            output_rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Record one analysis run; `output_rows` is `None` when it failed
    pub fn record(&self, analysis: &str, duration: Duration, output_rows: Option<usize>) {
        if let Ok(mut durations) = self.durations.write() {
            let times = durations.entry(analysis.to_string()).or_default();
            times.push(duration.as_micros() as u64);
            // Keep only the last 1000 per analysis
            if times.len() > 1000 {
                times.drain(0..500);
            }
        }

        match output_rows {
            Some(rows) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut outputs) = self.output_rows.write() {
                    outputs.insert(analysis.to_string(), rows);
                }
            }
            None => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Per-analysis statistics, keyed by analysis name
    pub fn get_analysis_stats(&self) -> BTreeMap<String, AnalysisStats> {
        let durations = match self.durations.read() {
            Ok(d) => d,
            Err(_) => return BTreeMap::new(),
        };
        let outputs = self.output_rows.read().ok();

        durations
            .iter()
            .filter(|(_, times)| !times.is_empty())
            .map(|(name, times)| {
                let mut sorted = times.clone();
                sorted.sort_unstable();
                let count = sorted.len();

                let stats = AnalysisStats {
                    runs: count as u64,
                    mean_us: sorted.iter().sum::<u64>() / count as u64,
                    p50_us: sorted[count / 2],
                    max_us: sorted[count - 1],
                    last_output_rows: outputs.as_ref().and_then(|o| o.get(name).copied()),
                };
                (name.clone(), stats)
            })
            .collect()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              TRANSACTION ANALYSIS - METRICS SUMMARY          ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Analyses Succeeded: {:>6}  │  Failed: {:>6}                ║",
            succeeded, failed
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        for (name, stats) in self.get_analysis_stats() {
            let rows = stats
                .last_output_rows
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            info!(
                "║ {:<12} runs={:<3} mean={:>8}μs max={:>8}μs rows={:>6}",
                name, stats.runs, stats.mean_us, stats.max_us, rows
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for AnalysisMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing statistics for one analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisStats {
    pub runs: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub max_us: u64,
    pub last_output_rows: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = AnalysisMetrics::new();

        metrics.record("anomalies", Duration::from_micros(100), Some(3));
        metrics.record("anomalies", Duration::from_micros(300), Some(5));
        metrics.record("forecast", Duration::from_micros(50), None);

        assert_eq!(metrics.succeeded.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.failed.load(Ordering::Relaxed), 1);

        let stats = metrics.get_analysis_stats();
        let anomalies = &stats["anomalies"];
        assert_eq!(anomalies.runs, 2);
        assert_eq!(anomalies.mean_us, 200);
        assert_eq!(anomalies.max_us, 300);
        assert_eq!(anomalies.last_output_rows, Some(5));

        assert_eq!(stats["forecast"].last_output_rows, None);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = AnalysisMetrics::new();
        assert!(metrics.get_analysis_stats().is_empty());
        metrics.print_summary();
    }
}
