//! CSV report writers.
//!
//! Each table starts with the eight input columns so reports can be fed back
//! through ingestion, followed by the columns the analysis added.

use crate::error::Result;
use crate::ingest::REQUIRED_COLUMNS;
use crate::types::insight::{
    AnalysisReport, AnomalyRecord, ForecastPoint, FraudFlag, SegmentedRecord,
};
use crate::types::transaction::Transaction;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

fn transaction_fields(tx: &Transaction) -> Vec<String> {
    let date = if tx.hour == 0 {
        tx.date.format("%Y-%m-%d").to_string()
    } else {
        format!("{} {:02}:00:00", tx.date.format("%Y-%m-%d"), tx.hour)
    };

    vec![
        tx.transaction_id.clone(),
        tx.user_id.clone(),
        date,
        tx.amount.to_string(),
        tx.merchant.clone(),
        tx.city.clone(),
        tx.txn_type.to_string(),
        tx.payment_method.to_string(),
    ]
}

fn header(extra: &[&str]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .chain(extra.iter())
        .map(|c| c.to_string())
        .collect()
}

pub fn write_anomalies<W: Write>(writer: W, records: &[AnomalyRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header(&["anomaly_score", "is_anomaly"]))?;
    for record in records {
        let mut row = transaction_fields(&record.transaction);
        row.push(record.anomaly_score.to_string());
        row.push(if record.is_anomaly { "Yes" } else { "No" }.to_string());
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_segments<W: Write>(writer: W, records: &[SegmentedRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header(&["segment"]))?;
    for record in records {
        let mut row = transaction_fields(&record.transaction);
        row.push(record.segment.to_string());
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_fraud_flags<W: Write>(writer: W, flags: &[FraudFlag]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header(&["fraud_rules"]))?;
    for flag in flags {
        let mut row = transaction_fields(&flag.transaction);
        row.push(flag.rules.join(";"));
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_forecast<W: Write>(writer: W, points: &[ForecastPoint]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["day_of_year", "predicted_spend"])?;
    for point in points {
        csv.write_record([point.day_of_year.to_string(), point.predicted_spend.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write one CSV per successful analysis into `dir`; failed analyses are skipped.
pub fn write_reports<P: AsRef<Path>>(dir: P, report: &AnalysisReport) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    let mut target = |name: &str| -> Result<File> {
        let path = dir.join(name);
        let file = File::create(&path)?;
        written.push(path);
        Ok(file)
    };

    if let Ok(anomalies) = &report.anomalies {
        let file = target("anomalies.csv")?;
        write_anomalies(file, anomalies)?;
    }
    if let Ok(segments) = &report.segments {
        let file = target("segments.csv")?;
        write_segments(file, segments)?;
    }
    if let Ok(flags) = &report.fraud_flags {
        let file = target("fraud_flags.csv")?;
        write_fraud_flags(file, flags)?;
    }
    if let Ok(forecast) = &report.forecast {
        let file = target("forecast.csv")?;
        write_forecast(file, &forecast.points)?;
    }

    info!(dir = %dir.display(), files = written.len(), "Reports written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::ingest::read_transactions;
    use chrono::NaiveDate;

    fn sample_tx() -> Transaction {
        let date = NaiveDate::from_ymd_opt(2023, 4, 9).unwrap();
        Transaction::new("TXN0009", "U004", date, 4800.25)
    }

    #[test]
    fn test_fraud_flags_csv_reingests() {
        let flags = vec![FraudFlag {
            transaction: sample_tx(),
            rules: vec!["high_amount".to_string(), "velocity".to_string()],
        }];

        let mut buf = Vec::new();
        write_fraud_flags(&mut buf, &flags).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();

        assert!(text.starts_with(
            "transaction_id,user_id,date,amount,merchant,city,txn_type,payment_method,fraud_rules"
        ));
        assert!(text.contains("high_amount;velocity"));

        let reloaded = read_transactions(buf.as_slice()).unwrap();
        assert_eq!(reloaded, vec![sample_tx()]);
    }

    #[test]
    fn test_anomaly_csv_columns() {
        let records = vec![AnomalyRecord {
            transaction: sample_tx(),
            anomaly_score: -0.125,
            is_anomaly: true,
        }];

        let mut buf = Vec::new();
        write_anomalies(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("anomaly_score,is_anomaly"));
        assert!(text.contains("-0.125,Yes"));
    }

    #[test]
    fn test_write_reports_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let report = AnalysisReport {
            rows: 1,
            anomalies: Ok(Vec::new()),
            segments: Ok(vec![SegmentedRecord {
                transaction: sample_tx(),
                segment: 2,
            }]),
            fraud_flags: Ok(Vec::new()),
            forecast: Err(AnalysisError::InsufficientData("one day".to_string())),
        };

        let written = write_reports(dir.path(), &report).unwrap();

        assert_eq!(written.len(), 3);
        assert!(dir.path().join("segments.csv").exists());
        assert!(!dir.path().join("forecast.csv").exists());

        let segments = fs::read_to_string(dir.path().join("segments.csv")).unwrap();
        assert!(segments.lines().nth(1).unwrap().ends_with(",2"));
    }
}
