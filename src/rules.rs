//! Deterministic fraud rules.
//!
//! Each rule is an independent predicate over the whole table so rules that
//! need context (other rows from the same user) fit the same interface as
//! simple per-row checks. A [`RuleSet`] ORs its rules together.

use crate::config::{FraudRuleSettings, VelocitySettings};
use crate::types::insight::FraudFlag;
use crate::types::transaction::Transaction;
use std::collections::HashMap;
use tracing::debug;

/// A named fraud predicate.
pub trait FraudRule: Send + Sync {
    /// Stable identifier reported on flagged rows.
    fn name(&self) -> &str;

    /// One verdict per transaction, in input order.
    fn evaluate(&self, transactions: &[Transaction]) -> Vec<bool>;
}

/// Flags transactions whose amount is strictly above a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighAmountRule {
    pub threshold: f64,
}

impl HighAmountRule {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        tx.amount > self.threshold
    }
}

impl FraudRule for HighAmountRule {
    fn name(&self) -> &str {
        "high_amount"
    }

    fn evaluate(&self, transactions: &[Transaction]) -> Vec<bool> {
        transactions.iter().map(|tx| self.matches(tx)).collect()
    }
}

/// Flags every transaction of a user that falls in a burst: more than
/// `max_transactions` within `window_days` consecutive calendar days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityRule {
    pub max_transactions: usize,
    pub window_days: i64,
}

impl From<VelocitySettings> for VelocityRule {
    fn from(settings: VelocitySettings) -> Self {
        Self {
            max_transactions: settings.max_transactions,
            window_days: settings.window_days.max(1),
        }
    }
}

impl FraudRule for VelocityRule {
    fn name(&self) -> &str {
        "velocity"
    }

    fn evaluate(&self, transactions: &[Transaction]) -> Vec<bool> {
        let mut by_user: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, tx) in transactions.iter().enumerate() {
            by_user.entry(tx.user_id.as_str()).or_default().push(i);
        }

        let mut flagged = vec![false; transactions.len()];
        for indices in by_user.values_mut() {
            indices.sort_by_key(|&i| transactions[i].date);

            // sliding window over the user's transactions in date order
            let mut start = 0;
            for end in 0..indices.len() {
                let end_date = transactions[indices[end]].date;
                while (end_date - transactions[indices[start]].date).num_days() >= self.window_days
                {
                    start += 1;
                }
                if end - start + 1 > self.max_transactions {
                    for &i in &indices[start..=end] {
                        flagged[i] = true;
                    }
                }
            }
        }

        flagged
    }
}

/// Ordered collection of rules evaluated together.
pub struct RuleSet {
    rules: Vec<Box<dyn FraudRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Build the rules enabled in configuration.
    pub fn from_settings(settings: &FraudRuleSettings) -> Self {
        let mut set = Self::new().with_rule(HighAmountRule::new(settings.amount_threshold));
        if let Some(velocity) = settings.velocity {
            set = set.with_rule(VelocityRule::from(velocity));
        }
        set
    }

    pub fn with_rule<R: FraudRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Rows caught by any rule, in input order, tagged with the rules that fired.
    pub fn apply(&self, transactions: &[Transaction]) -> Vec<FraudFlag> {
        let verdicts: Vec<(&str, Vec<bool>)> = self
            .rules
            .iter()
            .map(|rule| (rule.name(), rule.evaluate(transactions)))
            .collect();

        for (name, hits) in &verdicts {
            debug!(
                rule = %name,
                flagged = hits.iter().filter(|&&h| h).count(),
                "Fraud rule evaluated"
            );
        }

        transactions
            .iter()
            .enumerate()
            .filter_map(|(i, tx)| {
                let fired: Vec<String> = verdicts
                    .iter()
                    .filter(|(_, hits)| hits[i])
                    .map(|(name, _)| name.to_string())
                    .collect();

                (!fired.is_empty()).then(|| FraudFlag {
                    transaction: tx.clone(),
                    rules: fired,
                })
            })
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::from_settings(&FraudRuleSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(id: &str, user: &str, day: u32, amount: f64) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2023, 7, day).unwrap();
        Transaction::new(id, user, date, amount)
    }

    #[test]
    fn test_high_amount_is_strict() {
        let rule = HighAmountRule::new(4000.0);
        let data = vec![
            tx("T1", "U1", 1, 3999.99),
            tx("T2", "U1", 1, 4000.0),
            tx("T3", "U1", 1, 4000.01),
        ];

        assert_eq!(rule.evaluate(&data), vec![false, false, true]);
    }

    #[test]
    fn test_default_rule_set_flags_exactly_high_amounts() {
        let data: Vec<Transaction> = (1..=28)
            .map(|d| tx(&format!("T{}", d), "U1", d, d as f64 * 250.0))
            .collect();

        let flags = RuleSet::default().apply(&data);

        assert!(flags.iter().all(|f| f.transaction.amount > 4000.0));
        let expected = data.iter().filter(|t| t.amount > 4000.0).count();
        assert_eq!(flags.len(), expected);
        assert!(flags.iter().all(|f| f.rules == vec!["high_amount".to_string()]));
    }

    #[test]
    fn test_velocity_flags_bursty_user_only() {
        let rule = VelocityRule {
            max_transactions: 2,
            window_days: 2,
        };
        let data = vec![
            tx("A1", "burst", 10, 50.0),
            tx("B1", "calm", 10, 50.0),
            tx("A2", "burst", 11, 50.0),
            tx("B2", "calm", 15, 50.0),
            tx("A3", "burst", 11, 50.0),
            tx("A4", "burst", 20, 50.0),
            tx("B3", "calm", 20, 50.0),
        ];

        assert_eq!(
            rule.evaluate(&data),
            vec![true, false, true, false, true, false, false]
        );
    }

    #[test]
    fn test_rule_set_reports_every_fired_rule() {
        let settings = FraudRuleSettings {
            amount_threshold: 4000.0,
            velocity: Some(VelocitySettings {
                max_transactions: 1,
                window_days: 1,
            }),
        };
        let set = RuleSet::from_settings(&settings);
        assert_eq!(set.rule_names(), vec!["high_amount", "velocity"]);

        let data = vec![
            tx("T1", "U1", 3, 9000.0),
            tx("T2", "U1", 3, 20.0),
            tx("T3", "U2", 4, 20.0),
        ];
        let flags = set.apply(&data);

        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].transaction.transaction_id, "T1");
        assert_eq!(flags[0].rules, vec!["high_amount", "velocity"]);
        assert_eq!(flags[1].rules, vec!["velocity"]);
    }
}
