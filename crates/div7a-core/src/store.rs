//! Data store collaborator seam.
//!
//! The engine is agnostic to how the backing store expresses filtering;
//! it sees one repository trait and treats every error as "no data".
//! [`MemoryStore`] backs the CLI, the bindings and the test suite.

use std::collections::HashMap;

use crate::fy::FinancialYear;
use crate::types::{Money, Transaction, TransactionFilter};
use crate::TaxEngineResult;

/// Read-only access to a tenant's categorized transactions and related
/// balance-sheet facts. Implementations must bound their own query
/// timeouts; the engine catches every error and degrades.
pub trait TransactionStore {
    /// Rows matching the filter, in no particular order.
    fn query_flagged_transactions(
        &self,
        tenant_id: &str,
        filter: &TransactionFilter,
    ) -> TaxEngineResult<Vec<Transaction>>;

    /// Closing loan balance carried forward for a shareholder from the
    /// given (prior) financial year, when one was recorded.
    fn prior_year_balance(
        &self,
        tenant_id: &str,
        shareholder: &str,
        fy: FinancialYear,
    ) -> TaxEngineResult<Option<Money>>;

    /// Distributable surplus estimate (s 109Y) derived by the data layer,
    /// e.g. from retained earnings. `None` when nothing usable exists.
    fn distributable_surplus(&self, tenant_id: &str) -> TaxEngineResult<Option<Money>>;
}

/// In-memory store over a materialized transaction set.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    transactions: Vec<Transaction>,
    /// Keyed by lower-cased shareholder name.
    opening_balances: HashMap<String, Money>,
    surplus_estimate: Option<Money>,
}

impl MemoryStore {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        MemoryStore {
            transactions,
            opening_balances: HashMap::new(),
            surplus_estimate: None,
        }
    }

    pub fn with_opening_balance(mut self, shareholder: &str, balance: Money) -> Self {
        self.opening_balances
            .insert(shareholder.trim().to_lowercase(), balance);
        self
    }

    pub fn with_surplus_estimate(mut self, surplus: Money) -> Self {
        self.surplus_estimate = Some(surplus);
        self
    }
}

impl TransactionStore for MemoryStore {
    fn query_flagged_transactions(
        &self,
        tenant_id: &str,
        filter: &TransactionFilter,
    ) -> TaxEngineResult<Vec<Transaction>> {
        let rows = self
            .transactions
            .iter()
            .filter(|t| t.tenant_id == tenant_id)
            .filter(|t| !filter.risk_flagged_only || t.division7a_risk)
            .filter(|t| filter.from_year.map_or(true, |fy| t.financial_year >= fy))
            .filter(|t| filter.to_year.map_or(true, |fy| t.financial_year <= fy))
            .cloned()
            .collect();
        Ok(rows)
    }

    fn prior_year_balance(
        &self,
        _tenant_id: &str,
        shareholder: &str,
        _fy: FinancialYear,
    ) -> TaxEngineResult<Option<Money>> {
        Ok(self
            .opening_balances
            .get(&shareholder.trim().to_lowercase())
            .copied())
    }

    fn distributable_surplus(&self, _tenant_id: &str) -> TaxEngineResult<Option<Money>> {
        Ok(self.surplus_estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn txn(tenant: &str, fy: &str, date: (i32, u32, u32), flagged: bool) -> Transaction {
        Transaction {
            id: format!("t-{}-{}", tenant, date.2),
            tenant_id: tenant.to_string(),
            financial_year: fy.parse().unwrap(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount: dec!(1000),
            description: "Loan advance".to_string(),
            counterparty_name: Some("J Smith".to_string()),
            account_type: None,
            account_name: None,
            division7a_risk: flagged,
        }
    }

    #[test]
    fn test_filters_by_tenant() {
        let store = MemoryStore::new(vec![
            txn("a", "FY2023-24", (2023, 8, 1), true),
            txn("b", "FY2023-24", (2023, 8, 2), true),
        ]);
        let rows = store
            .query_flagged_transactions("a", &TransactionFilter::default())
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_filters_unflagged_rows() {
        let store = MemoryStore::new(vec![
            txn("a", "FY2023-24", (2023, 8, 1), true),
            txn("a", "FY2023-24", (2023, 8, 2), false),
        ]);
        let rows = store
            .query_flagged_transactions("a", &TransactionFilter::default())
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_filters_by_year_range() {
        let store = MemoryStore::new(vec![
            txn("a", "FY2021-22", (2021, 9, 1), true),
            txn("a", "FY2022-23", (2022, 9, 2), true),
            txn("a", "FY2023-24", (2023, 9, 3), true),
        ]);
        let filter = TransactionFilter {
            from_year: Some("FY2022-23".parse().unwrap()),
            to_year: Some("FY2022-23".parse().unwrap()),
            risk_flagged_only: true,
        };
        let rows = store.query_flagged_transactions("a", &filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].financial_year.to_string(), "FY2022-23");
    }

    #[test]
    fn test_opening_balance_lookup_is_case_insensitive() {
        let store = MemoryStore::new(vec![]).with_opening_balance("John Smith", dec!(5000));
        let balance = store
            .prior_year_balance("a", "john smith", "FY2022-23".parse().unwrap())
            .unwrap();
        assert_eq!(balance, Some(dec!(5000)));
    }
}
