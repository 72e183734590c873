//! Dashboard aggregates: total spend, spend by merchant and by day,
//! payment-method usage and segment sizes.
//!
//! Spend figures count DEBIT transactions only; usage counts include every row.

use crate::types::insight::SegmentedRecord;
use crate::types::transaction::Transaction;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantSpend {
    pub merchant: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySpend {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Summary charts data for one dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_spend: f64,
    /// Highest spend first
    pub spend_by_merchant: Vec<MerchantSpend>,
    /// Oldest date first
    pub daily_spend: Vec<DailySpend>,
    pub payment_method_counts: BTreeMap<String, usize>,
}

impl DashboardSummary {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let debits = || transactions.iter().filter(|tx| tx.is_debit());

        let total_spend = debits().map(|tx| tx.amount).sum();

        let mut by_merchant: HashMap<&str, f64> = HashMap::new();
        for tx in debits() {
            *by_merchant.entry(tx.merchant.as_str()).or_insert(0.0) += tx.amount;
        }
        let mut spend_by_merchant: Vec<MerchantSpend> = by_merchant
            .into_iter()
            .map(|(merchant, amount)| MerchantSpend {
                merchant: merchant.to_string(),
                amount,
            })
            .collect();
        spend_by_merchant.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| a.merchant.cmp(&b.merchant))
        });

        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for tx in debits() {
            *by_date.entry(tx.date).or_insert(0.0) += tx.amount;
        }
        let daily_spend = by_date
            .into_iter()
            .map(|(date, amount)| DailySpend { date, amount })
            .collect();

        let mut payment_method_counts = BTreeMap::new();
        for tx in transactions {
            *payment_method_counts
                .entry(tx.payment_method.to_string())
                .or_insert(0) += 1;
        }

        Self {
            total_spend,
            spend_by_merchant,
            daily_spend,
            payment_method_counts,
        }
    }
}

/// Rows per segment label
pub fn segment_counts(segments: &[SegmentedRecord]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for record in segments {
        *counts.entry(record.segment).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::{PaymentMethod, TxnType};

    fn tx(
        day: u32,
        amount: f64,
        merchant: &str,
        txn_type: TxnType,
        pm: PaymentMethod,
    ) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2023, 9, day).unwrap();
        let mut tx = Transaction::new("T", "U1", date, amount);
        tx.merchant = merchant.to_string();
        tx.txn_type = txn_type;
        tx.payment_method = pm;
        tx
    }

    #[test]
    fn test_summary_counts_debits_only() {
        let data = vec![
            tx(1, 100.0, "Swiggy", TxnType::Debit, PaymentMethod::Upi),
            tx(1, 50.0, "Amazon", TxnType::Debit, PaymentMethod::Card),
            tx(2, 400.0, "Amazon", TxnType::Debit, PaymentMethod::Upi),
            tx(2, 999.0, "Swiggy", TxnType::Credit, PaymentMethod::Netbanking),
        ];

        let summary = DashboardSummary::from_transactions(&data);

        assert_eq!(summary.total_spend, 550.0);
        assert_eq!(
            summary.spend_by_merchant,
            vec![
                MerchantSpend {
                    merchant: "Amazon".to_string(),
                    amount: 450.0,
                },
                MerchantSpend {
                    merchant: "Swiggy".to_string(),
                    amount: 100.0,
                },
            ]
        );
        assert_eq!(summary.daily_spend.len(), 2);
        assert_eq!(summary.daily_spend[0].amount, 150.0);
        assert_eq!(summary.daily_spend[1].amount, 400.0);

        assert_eq!(summary.payment_method_counts["UPI"], 2);
        assert_eq!(summary.payment_method_counts["Card"], 1);
        assert_eq!(summary.payment_method_counts["Netbanking"], 1);
    }

    #[test]
    fn test_segment_counts() {
        let base = tx(1, 10.0, "Uber", TxnType::Debit, PaymentMethod::Upi);
        let segments: Vec<SegmentedRecord> = [0, 2, 2, 3, 0, 2]
            .into_iter()
            .map(|segment| SegmentedRecord {
                transaction: base.clone(),
                segment,
            })
            .collect();

        let counts = segment_counts(&segments);
        assert_eq!(counts.get(&0), Some(&2));
        assert_eq!(counts.get(&1), None);
        assert_eq!(counts.get(&2), Some(&3));
        assert_eq!(counts.get(&3), Some(&1));
    }
}
