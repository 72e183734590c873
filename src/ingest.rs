//! CSV ingestion with an explicit schema.
//!
//! Every required column is located up front. Rows are then parsed into
//! [`Transaction`]s, and the first malformed value aborts the load with an
//! error that names its column and line. Nothing downstream ever sees a
//! partially valid table.

use crate::error::{AnalysisError, Result};
use crate::types::transaction::{PaymentMethod, Transaction, TxnType};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Columns every input file must carry, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "transaction_id",
    "user_id",
    "date",
    "amount",
    "merchant",
    "city",
    "txn_type",
    "payment_method",
];

/// Load transactions from a CSV file on disk.
pub fn load_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let transactions = read_transactions(file)?;

    info!(
        path = %path.display(),
        rows = transactions.len(),
        "Loaded transactions"
    );

    Ok(transactions)
}

/// Parse transactions from any CSV byte source (header row required).
pub fn read_transactions<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::resolve(&headers)?;

    let mut transactions = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = record.position().map(|p| p.line() as usize).unwrap_or(i + 2);
        transactions.push(columns.parse_row(&record, line)?);
    }

    debug!(rows = transactions.len(), "Parsed transaction rows");
    Ok(transactions)
}

/// Header name -> position for the required columns.
struct ColumnIndex {
    positions: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let name = header.trim().to_ascii_lowercase();
            let required = REQUIRED_COLUMNS.contains(&name.as_str());
            if by_name.insert(name.clone(), i).is_some() && required {
                return Err(AnalysisError::schema(name, "duplicate column"));
            }
        }

        let mut positions = HashMap::with_capacity(REQUIRED_COLUMNS.len());
        for column in REQUIRED_COLUMNS {
            match by_name.get(column) {
                Some(&idx) => {
                    positions.insert(column, idx);
                }
                None => {
                    return Err(AnalysisError::schema(column, "missing required column"));
                }
            }
        }

        Ok(Self { positions })
    }

    fn field<'r>(
        &self,
        record: &'r StringRecord,
        column: &'static str,
        line: usize,
    ) -> Result<&'r str> {
        let value = self
            .positions
            .get(column)
            .and_then(|&idx| record.get(idx))
            .unwrap_or("");

        if value.is_empty() {
            return Err(AnalysisError::schema(
                column,
                format!("empty value on line {}", line),
            ));
        }
        Ok(value)
    }

    fn parse_row(&self, record: &StringRecord, line: usize) -> Result<Transaction> {
        let raw_date = self.field(record, "date", line)?;
        let (date, hour) = parse_date(raw_date).ok_or_else(|| {
            AnalysisError::schema(
                "date",
                format!("expected YYYY-MM-DD on line {}, got '{}'", line, raw_date),
            )
        })?;

        let raw_amount = self.field(record, "amount", line)?;
        let amount: f64 = raw_amount
            .parse()
            .ok()
            .filter(|a: &f64| a.is_finite() && *a > 0.0)
            .ok_or_else(|| {
                AnalysisError::schema(
                    "amount",
                    format!(
                        "expected a positive number on line {}, got '{}'",
                        line, raw_amount
                    ),
                )
            })?;

        let txn_type: TxnType = self
            .field(record, "txn_type", line)?
            .parse()
            .map_err(|e| AnalysisError::schema("txn_type", format!("{} on line {}", e, line)))?;

        let payment_method: PaymentMethod = self
            .field(record, "payment_method", line)?
            .parse()
            .map_err(|e| {
                AnalysisError::schema("payment_method", format!("{} on line {}", e, line))
            })?;

        Ok(Transaction {
            transaction_id: self.field(record, "transaction_id", line)?.to_string(),
            user_id: self.field(record, "user_id", line)?.to_string(),
            date,
            hour,
            amount,
            merchant: self.field(record, "merchant", line)?.to_string(),
            city: self.field(record, "city", line)?.to_string(),
            txn_type,
            payment_method,
        })
    }
}

/// Accepts `YYYY-MM-DD` with an optional ` HH:MM:SS` / `THH:MM:SS` suffix.
fn parse_date(raw: &str) -> Option<(NaiveDate, u32)> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some((date, 0));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| (dt.date(), dt.hour()))
}
