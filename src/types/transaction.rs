//! Transaction data structures for spend analysis

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxnType {
    Debit,
    Credit,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Debit => "DEBIT",
            TxnType::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBIT" => Ok(TxnType::Debit),
            "CREDIT" => Ok(TxnType::Credit),
            other => Err(format!("expected DEBIT or CREDIT, got '{}'", other)),
        }
    }
}

/// Payment channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "UPI")]
    Upi,
    Card,
    Netbanking,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Card => "Card",
            PaymentMethod::Netbanking => "Netbanking",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upi" => Ok(PaymentMethod::Upi),
            "card" => Ok(PaymentMethod::Card),
            "netbanking" => Ok(PaymentMethod::Netbanking),
            other => Err(format!(
                "expected UPI, Card or Netbanking, got '{}'",
                other
            )),
        }
    }
}

/// A single transaction row from the uploaded CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier
    pub transaction_id: String,

    /// Owning user
    pub user_id: String,

    /// Calendar date of the transaction
    pub date: NaiveDate,

    /// Hour of day (0 when the input carries no time component)
    #[serde(default)]
    pub hour: u32,

    /// Transaction amount
    pub amount: f64,

    /// Merchant category
    pub merchant: String,

    /// City category
    pub city: String,

    /// Debit or credit
    pub txn_type: TxnType,

    /// Payment channel
    pub payment_method: PaymentMethod,
}

impl Transaction {
    /// Create a debit UPI transaction with placeholder categories
    pub fn new(transaction_id: &str, user_id: &str, date: NaiveDate, amount: f64) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            user_id: user_id.to_string(),
            date,
            hour: 0,
            amount,
            merchant: "Amazon".to_string(),
            city: "Delhi".to_string(),
            txn_type: TxnType::Debit,
            payment_method: PaymentMethod::Upi,
        }
    }

    /// Monday = 0 .. Sunday = 6
    pub fn day_of_week(&self) -> u32 {
        self.date.weekday().num_days_from_monday()
    }

    /// 1..=12
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// 1..=366
    pub fn day_of_year(&self) -> u32 {
        self.date.ordinal()
    }

    pub fn is_debit(&self) -> bool {
        self.txn_type == TxnType::Debit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_serialization() {
        let date = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        let tx = Transaction::new("TXN0001", "U001", date, 250.0);

        let json = serde_json::to_string(&tx).unwrap();
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();

        assert_eq!(tx, deserialized);
        assert!(json.contains("\"txn_type\":\"DEBIT\""));
        assert!(json.contains("\"payment_method\":\"UPI\""));
    }

    #[test]
    fn test_calendar_fields() {
        // 2023-03-15 was a Wednesday
        let date = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        let tx = Transaction::new("TXN0001", "U001", date, 250.0);

        assert_eq!(tx.day_of_week(), 2);
        assert_eq!(tx.month(), 3);
        assert_eq!(tx.day_of_year(), 74);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("debit".parse::<TxnType>().unwrap(), TxnType::Debit);
        assert_eq!(" CREDIT ".parse::<TxnType>().unwrap(), TxnType::Credit);
        assert!("REFUND".parse::<TxnType>().is_err());

        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert_eq!(
            "netbanking".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Netbanking
        );
        assert!("Cash".parse::<PaymentMethod>().is_err());
    }
}
