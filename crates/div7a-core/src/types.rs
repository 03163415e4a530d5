use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fy::FinancialYear;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.0877 = 8.77%). Never as percentages.
pub type Rate = Decimal;

/// A categorized transaction row as served by the data store.
///
/// Immutable input to the engine: nullable fields are normalized here, at
/// the ingestion boundary, so the internals never branch on field presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tenant_id: String,
    pub financial_year: FinancialYear,
    pub date: NaiveDate,
    /// Signed: positive amounts are money leaving the company (advances),
    /// negative amounts are money coming back (repayments). Description
    /// keywords override the sign where they disagree.
    pub amount: Money,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    /// Set by the upstream classification step, never by this engine.
    #[serde(default)]
    pub division7a_risk: bool,
}

/// Filter passed to the transaction store collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_year: Option<FinancialYear>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_year: Option<FinancialYear>,
    /// When true, only rows carrying the `division7a_risk` flag are returned.
    pub risk_flagged_only: bool,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        TransactionFilter {
            from_year: None,
            to_year: None,
            risk_flagged_only: true,
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
