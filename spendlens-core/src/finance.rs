//! Canonical transaction records shared by ingestion and classification.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Money direction as printed on the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "Debit",
            Direction::Credit => "Credit",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of statement a record came from, supplied by the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementSource {
    #[serde(rename = "Bank")]
    Bank,
    #[serde(rename = "UPI")]
    Upi,
    #[serde(rename = "Credit Card")]
    CreditCard,
}

impl StatementSource {
    /// Accepts the loose spellings users type (`card`, `gpay`, `bank account`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "credit card" | "creditcard" | "credit-card" | "card" => Some(StatementSource::CreditCard),
            "bank" | "bank account" | "account" => Some(StatementSource::Bank),
            "upi" | "gpay" | "phonepe" => Some(StatementSource::Upi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementSource::Bank => "Bank",
            StatementSource::Upi => "UPI",
            StatementSource::CreditCard => "Credit Card",
        }
    }
}

impl fmt::Display for StatementSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a transaction's category/tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    AiVerified,
    HumanVerified,
    RequiredHumanVerification,
}

impl VerificationStatus {
    /// Statuses whose category/tags are trusted for reporting.
    pub const TRUSTED: [VerificationStatus; 2] =
        [VerificationStatus::AiVerified, VerificationStatus::HumanVerified];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::AiVerified => "ai_verified",
            VerificationStatus::HumanVerified => "human_verified",
            VerificationStatus::RequiredHumanVerification => "required_human_verification",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// Assigned by the store on insert
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub owner_id: Option<String>,
    /// `None` when no known date layout matched
    pub date: Option<NaiveDate>,
    pub details: String,
    /// Always >= 0, two decimal places
    pub amount: f64,
    pub direction: Direction,
    #[serde(default)]
    pub statement_source: Option<StatementSource>,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Deduplication key: `(date, details, direction, amount)`.
///
/// Amount is held in minor units so the key is hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey {
    pub date: Option<NaiveDate>,
    pub details: String,
    pub direction: Direction,
    pub amount_minor: i64,
}

impl NormalizedTransaction {
    pub fn new(
        date: Option<NaiveDate>,
        details: impl Into<String>,
        amount: f64,
        direction: Direction,
    ) -> Self {
        Self {
            id: None,
            owner_id: None,
            date,
            details: details.into(),
            amount: round_money(amount.abs()),
            direction,
            statement_source: None,
            verification_status: VerificationStatus::Unverified,
            category: None,
            tags: Vec::new(),
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_source(mut self, source: StatementSource) -> Self {
        self.statement_source = Some(source);
        self
    }

    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            date: self.date,
            details: self.details.clone(),
            direction: self.direction,
            amount_minor: (self.amount * 100.0).round() as i64,
        }
    }

    pub fn is_debit(&self) -> bool {
        self.direction == Direction::Debit
    }

    pub fn is_trusted(&self) -> bool {
        VerificationStatus::TRUSTED.contains(&self.verification_status)
    }
}

/// Round to two decimal places.
pub fn round_money(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_unverified_and_non_negative() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let t = NormalizedTransaction::new(Some(date), "Blinkit", -425.004, Direction::Debit);
        assert_eq!(t.amount, 425.0);
        assert_eq!(t.verification_status, VerificationStatus::Unverified);
        assert!(t.is_debit());
    }

    #[test]
    fn test_natural_key_ignores_owner_and_status() {
        let a = NormalizedTransaction::new(None, "NETFLIX", 649.0, Direction::Debit).with_owner("u1");
        let mut b = NormalizedTransaction::new(None, "NETFLIX", 649.0, Direction::Debit);
        b.verification_status = VerificationStatus::AiVerified;
        assert_eq!(a.natural_key(), b.natural_key());

        let c = NormalizedTransaction::new(None, "NETFLIX", 649.0, Direction::Credit);
        assert_ne!(a.natural_key(), c.natural_key());
    }

    #[test]
    fn test_statement_source_aliases() {
        assert_eq!(StatementSource::parse("Card"), Some(StatementSource::CreditCard));
        assert_eq!(StatementSource::parse(" bank account "), Some(StatementSource::Bank));
        assert_eq!(StatementSource::parse("PhonePe"), Some(StatementSource::Upi));
        assert_eq!(StatementSource::parse("wallet"), None);
    }

    #[test]
    fn test_status_wire_names() {
        let s = serde_json::to_string(&VerificationStatus::RequiredHumanVerification).unwrap();
        assert_eq!(s, "\"required_human_verification\"");
        let src = serde_json::to_string(&StatementSource::CreditCard).unwrap();
        assert_eq!(src, "\"Credit Card\"");
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(10.126), 10.13);
        assert_eq!(round_money(5.9), 5.9);
    }
}
