//! Fraud alert desk: suspicious-transaction cases kept in SQLite.

pub mod db;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

pub use db::FraudDatabase;

#[derive(Error, Debug)]
pub enum FraudDbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Fraud case {0} not found")]
    NotFound(String),
    #[error("Database lock poisoned")]
    Poisoned,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    ConfirmedFraud,
    ConfirmedSafe,
    VerificationFailed,
}

fn pending_outcome() -> String {
    "pending".to_string()
}

/// A flagged card transaction awaiting a call with the card holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudCase {
    pub id: String,
    pub user_name: String,
    pub security_identifier: String,
    pub card_ending: String,
    pub card_type: String,
    pub transaction_name: String,
    pub transaction_amount: String,
    pub transaction_time: String,
    pub transaction_location: String,
    pub transaction_category: String,
    pub transaction_source: String,
    pub status: CaseStatus,
    pub security_question: String,
    pub security_answer: String,
    pub created_at: String,
    #[serde(default = "pending_outcome")]
    pub outcome: String,
    #[serde(default)]
    pub outcome_note: String,
}

impl FraudCase {
    /// One sentence describing the flagged transaction, for reading aloud
    pub fn transaction_summary(&self) -> String {
        format!(
            "A charge of {} at {} ({}) on your {} card ending in {}, made {} from {} via {}.",
            self.transaction_amount,
            self.transaction_name,
            self.transaction_category,
            self.card_type,
            self.card_ending,
            self.transaction_time,
            self.transaction_location,
            self.transaction_source
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, CaseStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStatistics {
    pub total_cases: u64,
    pub confirmed_fraud: u64,
    pub confirmed_safe: u64,
    pub pending: u64,
    pub verification_failed: u64,
}

/// Demo cases used to populate an empty database
pub fn sample_cases() -> Vec<FraudCase> {
    let created_at = crate::commerce::orders::utc_now();
    let case = |id: &str,
                user_name: &str,
                security_identifier: &str,
                card_ending: &str,
                card_type: &str,
                merchant: (&str, &str, &str, &str),
                when: &str,
                source: &str,
                question: &str,
                answer: &str| FraudCase {
        id: id.to_string(),
        user_name: user_name.to_string(),
        security_identifier: security_identifier.to_string(),
        card_ending: card_ending.to_string(),
        card_type: card_type.to_string(),
        transaction_name: merchant.0.to_string(),
        transaction_amount: merchant.1.to_string(),
        transaction_location: merchant.2.to_string(),
        transaction_category: merchant.3.to_string(),
        transaction_time: when.to_string(),
        transaction_source: source.to_string(),
        status: CaseStatus::Pending,
        security_question: question.to_string(),
        security_answer: answer.to_string(),
        created_at: created_at.clone(),
        outcome: pending_outcome(),
        outcome_note: String::new(),
    };

    vec![
        case(
            "case-001",
            "Aarav Sharma",
            "AS-48213",
            "4242",
            "Visa",
            ("ABC Industry Electronics", "₹48,999", "Shenzhen, China", "electronics"),
            "yesterday at 2:14 AM",
            "alibaba.com",
            "What is the name of your first pet?",
            "bruno",
        ),
        case(
            "case-002",
            "Priya Patel",
            "PP-90177",
            "1881",
            "Mastercard",
            ("Luxe Travel Deals", "₹1,12,500", "Dubai, UAE", "travel"),
            "today at 4:40 AM",
            "luxetraveldeals.net",
            "In which city were you born?",
            "surat",
        ),
        case(
            "case-003",
            "Rohan Mehta",
            "RM-55302",
            "7305",
            "RuPay",
            ("QuickGift Cards", "₹25,000", "Lagos, Nigeria", "gift cards"),
            "today at 11:05 PM",
            "quickgift.io",
            "What was your school's name?",
            "st xavier's",
        ),
    ]
}
