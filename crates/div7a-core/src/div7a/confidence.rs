//! Classification confidence scoring.
//!
//! Advisory only: annotates each loan analysis with how strongly the
//! grouped transactions look like a genuine Division 7A loan, and which
//! heuristics fired. Never blocks analysis.

use serde::{Deserialize, Serialize};

use crate::div7a::loans::LoanFact;

/// Every row reaching the engine already carries the upstream
/// `division7a_risk` flag, which is worth this much on its own.
const BASE_CONFIDENCE: u32 = 30;

const MAX_CONFIDENCE: u32 = 100;

/// (keyword, weight, signal) matched against account type and name.
const ACCOUNT_SIGNALS: &[(&str, u32, &str)] = &[
    (
        "director loan",
        30,
        "Account name references a director loan account",
    ),
    (
        "shareholder loan",
        30,
        "Account name references a shareholder loan account",
    ),
    ("loan", 15, "Account is loan-related"),
    ("liability", 10, "Posted to a liability account"),
];

/// (keyword, weight, signal) matched against movement descriptions.
const DESCRIPTION_SIGNALS: &[(&str, u32, &str)] = &[
    ("loan", 15, "Description references a loan"),
    ("advance", 10, "Description references an advance"),
    ("drawing", 10, "Description references drawings"),
    ("shareholder", 10, "Description references a shareholder"),
    ("director", 10, "Description references a director"),
];

/// Weight when the counterparty matches a known company officer.
const OFFICER_MATCH_WEIGHT: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationScore {
    /// 0–100.
    pub confidence: u32,
    /// Which heuristics fired, for audit and debugging.
    pub signals: Vec<String>,
}

/// Score how confidently the grouped transactions represent a Division 7A
/// loan. Each rule fires at most once per loan; the weighted sum is
/// clamped to [0, 100].
pub fn score_classification(fact: &LoanFact, known_officers: &[String]) -> ClassificationScore {
    let mut confidence = BASE_CONFIDENCE;
    let mut signals = vec!["Flagged as Division 7A risk by upstream classification".to_string()];

    let account_text: String = fact
        .movements
        .iter()
        .flat_map(|m| [m.account_type.as_deref(), m.account_name.as_deref()])
        .flatten()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase();

    for (keyword, weight, signal) in ACCOUNT_SIGNALS {
        if account_text.contains(keyword) {
            confidence += weight;
            signals.push((*signal).to_string());
        }
    }

    let description_text: String = fact
        .movements
        .iter()
        .map(|m| m.description.as_str())
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase();

    for (keyword, weight, signal) in DESCRIPTION_SIGNALS {
        if description_text.contains(keyword) {
            confidence += weight;
            signals.push((*signal).to_string());
        }
    }

    let shareholder_key = fact.key();
    if known_officers
        .iter()
        .any(|officer| officer.trim().to_lowercase() == shareholder_key)
    {
        confidence += OFFICER_MATCH_WEIGHT;
        signals.push("Counterparty matches a known company officer".to_string());
    }

    ClassificationScore {
        confidence: confidence.min(MAX_CONFIDENCE),
        signals,
    }
}
