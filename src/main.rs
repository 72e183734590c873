//! Transaction Insights - Main Entry Point
//!
//! Loads a transaction CSV, runs the four analyses in parallel and prints a
//! JSON report. CSV reports are written when `output.report_dir` is set.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use transaction_insights::{
    config::{AppConfig, LoggingConfig},
    export, ingest,
    summary::{segment_counts, DashboardSummary},
    TransactionAnalyzer,
};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("transaction_insights={}", logging.level).parse()?);

    // stdout carries the report
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(csv_path) = args.next() else {
        bail!("usage: transaction-insights <transactions.csv> [config.toml]");
    };

    let config = match args.next() {
        Some(path) => AppConfig::load_from_path(&path)?,
        None => AppConfig::load()?,
    };

    init_logging(&config.logging)?;
    info!("Starting Transaction Insights");
    info!(
        "Contamination: {:.3}, segments: {}, threshold: {:.2}, forecast: {:?} x {} days",
        config.analysis.anomaly.contamination,
        config.analysis.segmentation.n_clusters,
        config.analysis.fraud_rules.amount_threshold,
        config.analysis.forecast.horizon,
        config.analysis.forecast.days
    );

    let transactions = ingest::load_transactions(&csv_path)
        .with_context(|| format!("Failed to load transactions from {}", csv_path))?;

    let summary = DashboardSummary::from_transactions(&transactions);
    info!(
        rows = transactions.len(),
        total_spend = summary.total_spend,
        merchants = summary.spend_by_merchant.len(),
        days = summary.daily_spend.len(),
        "Dataset summary"
    );

    let analyzer = Arc::new(TransactionAnalyzer::new(config.analysis.clone()));
    let report = Arc::clone(&analyzer)
        .run_parallel(Arc::from(transactions))
        .await;

    if let Ok(segments) = &report.segments {
        for (segment, count) in segment_counts(segments) {
            info!(segment, count, "Segment size");
        }
    }

    let output = serde_json::json!({
        "summary": summary,
        "report": report.view(),
    });
    let rendered = if config.output.pretty_json {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);

    if let Some(dir) = &config.output.report_dir {
        let written = export::write_reports(dir, &report)
            .with_context(|| format!("Failed to write reports to {}", dir))?;
        for path in written {
            info!(path = %path.display(), "Report file");
        }
    }

    let failures = report.failure_count();
    if failures > 0 {
        warn!(failures, "Some analyses failed");
    }

    analyzer.metrics().print_summary();
    Ok(())
}
