//! Loan reconstruction: raw transaction rows → one [`LoanFact`] per
//! shareholder, with chronological movements and a carried-forward
//! opening balance.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Transaction};

/// Bucket for rows whose counterparty is missing or blank.
pub const UNKNOWN_SHAREHOLDER: &str = "Unknown Shareholder";

/// Description keywords that mark a movement as money coming back to the
/// company, regardless of sign.
const REPAYMENT_KEYWORDS: &[&str] = &[
    "repayment",
    "repaid",
    "loan payment",
    "interest paid",
    "payback",
];

/// Description keywords that mark a movement as a fresh advance.
const ADVANCE_KEYWORDS: &[&str] = &["advance", "loan to", "drawdown", "drawing"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Advance,
    Repayment,
}

/// A single dated movement on a reconstructed loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanMovement {
    pub date: NaiveDate,
    pub kind: MovementKind,
    /// Magnitude; always positive. Use [`LoanMovement::signed`] for the
    /// balance delta.
    pub amount: Money,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

impl LoanMovement {
    pub fn signed(&self) -> Money {
        match self.kind {
            MovementKind::Advance => self.amount,
            MovementKind::Repayment => -self.amount,
        }
    }
}

/// Per-shareholder loan reconstruction for one analysis run. In-memory
/// intermediate only; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanFact {
    pub shareholder: String,
    pub opening_balance: Money,
    /// Chronological, oldest first.
    pub movements: Vec<LoanMovement>,
    /// opening + Σ signed movements, floored at zero.
    pub closing_balance: Money,
    pub notes: Vec<String>,
}

impl LoanFact {
    /// Case-normalized grouping key for this shareholder.
    pub fn key(&self) -> String {
        normalize_shareholder_key(&self.shareholder)
    }

    /// Total of repayment movements, when any were observed.
    pub fn observed_repayments(&self) -> Option<Money> {
        let repayments: Vec<&LoanMovement> = self
            .movements
            .iter()
            .filter(|m| m.kind == MovementKind::Repayment)
            .collect();
        if repayments.is_empty() {
            None
        } else {
            Some(repayments.iter().map(|m| m.amount).sum())
        }
    }
}

pub fn normalize_shareholder_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn display_name(counterparty: Option<&str>) -> String {
    match counterparty.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => UNKNOWN_SHAREHOLDER.to_string(),
    }
}

/// Classify a transaction as an advance or a repayment. Description
/// keywords win; the sign of the amount is the fallback (positive =
/// money out of the company = advance).
pub fn classify_movement(description: &str, amount: Money) -> MovementKind {
    let lowered = description.to_lowercase();
    if REPAYMENT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return MovementKind::Repayment;
    }
    if ADVANCE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return MovementKind::Advance;
    }
    if amount < Decimal::ZERO {
        MovementKind::Repayment
    } else {
        MovementKind::Advance
    }
}

/// Group flagged transactions into one [`LoanFact`] per distinct
/// shareholder (case-insensitive). `opening_balance_for` supplies the
/// prior-year carried balance for a shareholder key, defaulting to zero.
///
/// A closing balance that goes negative is reported as zero with an
/// overpayment note: a negative loan is not propagated into downstream
/// risk calculations.
pub fn group_transactions_into_loans<F>(
    transactions: &[Transaction],
    opening_balance_for: F,
) -> Vec<LoanFact>
where
    F: Fn(&str) -> Money,
{
    // BTreeMap keyed on the normalized name gives deterministic output order.
    let mut groups: BTreeMap<String, (String, Vec<LoanMovement>)> = BTreeMap::new();

    for txn in transactions {
        let name = display_name(txn.counterparty_name.as_deref());
        let key = normalize_shareholder_key(&name);
        let kind = classify_movement(&txn.description, txn.amount);
        let movement = LoanMovement {
            date: txn.date,
            kind,
            amount: txn.amount.abs(),
            description: txn.description.clone(),
            account_type: txn.account_type.clone(),
            account_name: txn.account_name.clone(),
        };
        groups
            .entry(key)
            .or_insert_with(|| (name, Vec::new()))
            .1
            .push(movement);
    }

    groups
        .into_iter()
        .map(|(key, (name, mut movements))| {
            movements.sort_by_key(|m| m.date);

            let opening = opening_balance_for(&key);
            let raw_closing: Money =
                opening + movements.iter().map(LoanMovement::signed).sum::<Money>();

            let mut notes = Vec::new();
            let closing = if raw_closing < Decimal::ZERO {
                notes.push(format!(
                    "Recorded repayments exceed advances plus opening balance by {}; \
                     loan treated as fully repaid, review for misclassified transactions",
                    -raw_closing
                ));
                Decimal::ZERO
            } else {
                raw_closing
            };

            LoanFact {
                shareholder: name,
                opening_balance: opening,
                movements,
                closing_balance: closing,
                notes,
            }
        })
        .collect()
}
