//! Tenant-level aggregation and the engine entry point.
//!
//! `Div7aEngine::analyze` is infallible by design: collaborator failures
//! degrade to an empty or partial summary, with the degradation recorded
//! in the summary's `warnings`. The calling layer decides whether to log
//! or retry; the engine itself holds no mutable state and every
//! invocation builds a fresh summary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::div7a::confidence::score_classification;
use crate::div7a::evaluation::{evaluate_loan, Division7aAnalysis, RiskLevel};
use crate::div7a::exclusions::{detect_amalgamation, detect_safe_harbour, SafeHarbourExclusion};
use crate::div7a::loans::group_transactions_into_loans;
use crate::div7a::surplus::{cap_exposure, SurplusSource};
use crate::fy::{Clock, FinancialYear};
use crate::rates::{benchmark_rate_for, RateFeed, RateSource};
use crate::store::TransactionStore;
use crate::types::{Money, TransactionFilter};

/// Options for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_year: Option<FinancialYear>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_year: Option<FinancialYear>,
    /// Caller-supplied distributable surplus (s 109Y). Overrides any
    /// estimate from the data layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_distributable_surplus: Option<Money>,
    /// Known officers/shareholders, used by the confidence scorer.
    #[serde(default)]
    pub known_officers: Vec<String>,
}

/// Loan count per risk level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl RiskDistribution {
    fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Critical => self.critical += 1,
        }
    }
}

/// Aggregate Division 7A findings for one tenant and run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Div7aSummary {
    pub tenant_id: String,
    pub total_loans: u32,
    pub total_loan_balance: Money,
    pub compliant_loans: u32,
    pub non_compliant_loans: u32,
    pub risk_distribution: RiskDistribution,
    pub total_deemed_dividend_risk: Money,
    pub capped_total_deemed_dividend_risk: Money,
    pub total_potential_tax_liability: Money,
    pub capped_total_potential_tax_liability: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributable_surplus: Option<Money>,
    pub distributable_surplus_source: SurplusSource,
    pub has_amalgamation_warnings: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub amalgamation_notes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub safe_harbour_exclusions: Vec<SafeHarbourExclusion>,
    pub tax_rate_source: RateSource,
    pub tax_rate_verified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    pub loan_analyses: Vec<Division7aAnalysis>,
}

/// The Division 7A compliance engine, wired to its collaborators.
pub struct Div7aEngine<'a> {
    store: &'a dyn TransactionStore,
    rate_feed: Option<&'a dyn RateFeed>,
    clock: &'a dyn Clock,
}

impl<'a> Div7aEngine<'a> {
    pub fn new(
        store: &'a dyn TransactionStore,
        rate_feed: Option<&'a dyn RateFeed>,
        clock: &'a dyn Clock,
    ) -> Self {
        Div7aEngine {
            store,
            rate_feed,
            clock,
        }
    }

    /// Analyze a tenant's flagged transactions. Never fails: a store
    /// error yields an all-zero summary with a warning entry, exactly as
    /// an empty result set would.
    pub fn analyze(&self, tenant_id: &str, options: &AnalysisOptions) -> Div7aSummary {
        let current_fy = FinancialYear::from_date(self.clock.today());
        let rate_fy = options.to_year.unwrap_or(current_fy);
        let rate = benchmark_rate_for(rate_fy, current_fy, self.rate_feed);

        let mut warnings = Vec::new();

        let filter = TransactionFilter {
            from_year: options.from_year,
            to_year: options.to_year,
            risk_flagged_only: true,
        };
        let transactions = match self.store.query_flagged_transactions(tenant_id, &filter) {
            Ok(rows) => rows,
            Err(e) => {
                warnings.push(format!(
                    "Transaction store unavailable ({e}); reporting no Division 7A findings"
                ));
                Vec::new()
            }
        };

        // Opening balances carry forward from the year before the window.
        let opening_fy = options.from_year.unwrap_or(current_fy).prior();
        let facts = group_transactions_into_loans(&transactions, |shareholder| {
            self.store
                .prior_year_balance(tenant_id, shareholder, opening_fy)
                .ok()
                .flatten()
                .unwrap_or(Decimal::ZERO)
        });

        let safe_harbour_exclusions = detect_safe_harbour(&facts);

        let mut loan_analyses = Vec::with_capacity(facts.len());
        for fact in &facts {
            let score = score_classification(fact, &options.known_officers);
            match evaluate_loan(fact, &rate, fact.observed_repayments(), score) {
                Ok(analysis) => loan_analyses.push(analysis),
                Err(e) => warnings.push(format!(
                    "Skipped loan for '{}': {e}",
                    fact.shareholder
                )),
            }
        }

        let (has_amalgamation_warnings, amalgamation_notes) = detect_amalgamation(&loan_analyses);

        let surplus = options
            .known_distributable_surplus
            .map(|s| (s, SurplusSource::Provided))
            .or_else(|| {
                self.store
                    .distributable_surplus(tenant_id)
                    .ok()
                    .flatten()
                    .map(|s| (s, SurplusSource::Estimated))
            });
        let cap = cap_exposure(&loan_analyses, surplus);

        let mut risk_distribution = RiskDistribution::default();
        let mut compliant_loans = 0u32;
        let mut non_compliant_loans = 0u32;
        let mut total_loan_balance = Decimal::ZERO;
        for analysis in &loan_analyses {
            risk_distribution.record(analysis.risk_level);
            if analysis.scenario_with_agreement.is_compliant {
                compliant_loans += 1;
            } else {
                non_compliant_loans += 1;
            }
            total_loan_balance += analysis.closing_balance;
        }

        Div7aSummary {
            tenant_id: tenant_id.to_string(),
            total_loans: loan_analyses.len() as u32,
            total_loan_balance,
            compliant_loans,
            non_compliant_loans,
            risk_distribution,
            total_deemed_dividend_risk: cap.total_deemed_dividend_risk,
            capped_total_deemed_dividend_risk: cap.capped_total_deemed_dividend_risk,
            total_potential_tax_liability: cap.total_potential_tax_liability,
            capped_total_potential_tax_liability: cap.capped_total_potential_tax_liability,
            distributable_surplus: cap.distributable_surplus,
            distributable_surplus_source: cap.distributable_surplus_source,
            has_amalgamation_warnings,
            amalgamation_notes,
            safe_harbour_exclusions,
            tax_rate_source: rate.source,
            tax_rate_verified_at: Utc::now(),
            warnings,
            loan_analyses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaxEngineError;
    use crate::fy::FixedClock;
    use crate::store::MemoryStore;
    use crate::types::Transaction;
    use crate::TaxEngineResult;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    fn txn(counterparty: &str, date: (i32, u32, u32), amount: Money, desc: &str) -> Transaction {
        Transaction {
            id: format!("t-{}-{}-{}", counterparty, date.1, date.2),
            tenant_id: "tenant-1".to_string(),
            financial_year: FinancialYear::from_date(
                NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            ),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
            description: desc.to_string(),
            counterparty_name: Some(counterparty.to_string()),
            account_type: Some("Liability".to_string()),
            account_name: Some("Director Loan Account".to_string()),
            division7a_risk: true,
        }
    }

    struct FailingStore;

    impl TransactionStore for FailingStore {
        fn query_flagged_transactions(
            &self,
            _tenant_id: &str,
            _filter: &TransactionFilter,
        ) -> TaxEngineResult<Vec<Transaction>> {
            Err(TaxEngineError::CollaboratorUnavailable {
                collaborator: "transaction store".to_string(),
                reason: "timeout".to_string(),
            })
        }

        fn prior_year_balance(
            &self,
            _tenant_id: &str,
            _shareholder: &str,
            _fy: FinancialYear,
        ) -> TaxEngineResult<Option<Money>> {
            Ok(None)
        }

        fn distributable_surplus(&self, _tenant_id: &str) -> TaxEngineResult<Option<Money>> {
            Ok(None)
        }
    }

    #[test]
    fn test_empty_input_yields_zero_summary() {
        let store = MemoryStore::new(vec![]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        assert_eq!(summary.total_loans, 0);
        assert_eq!(summary.total_loan_balance, Decimal::ZERO);
        assert_eq!(summary.total_deemed_dividend_risk, Decimal::ZERO);
        assert!(summary.loan_analyses.is_empty());
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn test_store_error_yields_same_zero_summary_with_warning() {
        let store = FailingStore;
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        assert_eq!(summary.total_loans, 0);
        assert!(summary.loan_analyses.is_empty());
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("unavailable"));
    }

    #[test]
    fn test_two_shareholders_produce_two_analyses() {
        let store = MemoryStore::new(vec![
            txn("John Smith", (2024, 8, 1), dec!(60000), "Loan advance"),
            txn("Jane Doe", (2024, 9, 1), dec!(40000), "Loan advance"),
        ]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        assert_eq!(summary.total_loans, 2);
        assert_eq!(summary.total_loan_balance, dec!(100000));
        assert_eq!(summary.total_deemed_dividend_risk, dec!(100000));
    }

    #[test]
    fn test_fully_repaid_loan_is_low_risk() {
        let store = MemoryStore::new(vec![
            txn("John Smith", (2024, 8, 1), dec!(10000), "Loan advance"),
            txn("John Smith", (2025, 1, 10), dec!(-10000), "Loan repayment"),
        ]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        assert_eq!(summary.total_loans, 1);
        assert_eq!(summary.loan_analyses[0].closing_balance, Decimal::ZERO);
        assert_eq!(summary.risk_distribution.low, 1);
    }

    #[test]
    fn test_provided_surplus_caps_totals() {
        let store = MemoryStore::new(vec![txn(
            "John Smith",
            (2024, 8, 1),
            dec!(100000),
            "Loan advance",
        )]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let options = AnalysisOptions {
            known_distributable_surplus: Some(dec!(30000)),
            ..Default::default()
        };
        let summary = engine.analyze("tenant-1", &options);
        assert_eq!(summary.total_deemed_dividend_risk, dec!(100000));
        assert_eq!(summary.capped_total_deemed_dividend_risk, dec!(30000));
        assert_eq!(summary.distributable_surplus_source, SurplusSource::Provided);
    }

    #[test]
    fn test_store_estimate_used_when_no_override() {
        let store = MemoryStore::new(vec![txn(
            "John Smith",
            (2024, 8, 1),
            dec!(100000),
            "Loan advance",
        )])
        .with_surplus_estimate(dec!(40000));
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        assert_eq!(summary.capped_total_deemed_dividend_risk, dec!(40000));
        assert_eq!(
            summary.distributable_surplus_source,
            SurplusSource::Estimated
        );
    }

    #[test]
    fn test_override_beats_store_estimate() {
        let store = MemoryStore::new(vec![txn(
            "John Smith",
            (2024, 8, 1),
            dec!(100000),
            "Loan advance",
        )])
        .with_surplus_estimate(dec!(40000));
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let options = AnalysisOptions {
            known_distributable_surplus: Some(dec!(25000)),
            ..Default::default()
        };
        let summary = engine.analyze("tenant-1", &options);
        assert_eq!(summary.capped_total_deemed_dividend_risk, dec!(25000));
        assert_eq!(summary.distributable_surplus_source, SurplusSource::Provided);
    }

    #[test]
    fn test_unknown_surplus_applies_no_cap() {
        let store = MemoryStore::new(vec![txn(
            "John Smith",
            (2024, 8, 1),
            dec!(100000),
            "Loan advance",
        )]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        assert_eq!(
            summary.capped_total_deemed_dividend_risk,
            summary.total_deemed_dividend_risk
        );
        assert_eq!(summary.distributable_surplus_source, SurplusSource::Unknown);
    }

    #[test]
    fn test_opening_balance_feeds_analysis() {
        let store = MemoryStore::new(vec![txn(
            "John Smith",
            (2024, 8, 1),
            dec!(5000),
            "Loan advance",
        )])
        .with_opening_balance("John Smith", dec!(20000));
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        assert_eq!(summary.loan_analyses[0].opening_balance, dec!(20000));
        assert_eq!(summary.loan_analyses[0].closing_balance, dec!(25000));
    }

    #[test]
    fn test_safe_harbour_exclusion_surfaced() {
        let store = MemoryStore::new(vec![
            txn("John Smith", (2024, 8, 1), dec!(50000), "Loan advance"),
            txn("John Smith", (2024, 9, 1), dec!(8000), "Monthly salary payment"),
        ]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        assert_eq!(summary.safe_harbour_exclusions.len(), 1);
        assert!(summary.safe_harbour_exclusions[0].note.contains("s 109RB"));
        // advisory only: the movement stays in the balance
        assert_eq!(summary.total_loan_balance, dec!(58000));
    }

    #[test]
    fn test_exact_grouping_never_amalgamates() {
        let store = MemoryStore::new(vec![
            txn("John Smith", (2024, 8, 1), dec!(10000), "Loan advance"),
            txn("JOHN SMITH", (2024, 9, 1), dec!(5000), "Loan advance"),
        ]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        // case variants merge at grouping time, so no amalgamation warning
        assert_eq!(summary.total_loans, 1);
        assert!(!summary.has_amalgamation_warnings);
    }

    #[test]
    fn test_rate_provenance_recorded() {
        let store = MemoryStore::new(vec![]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        // FY2024-25 is in the historical table and no live feed is wired
        assert_eq!(summary.tax_rate_source, RateSource::Historical);
    }

    #[test]
    fn test_year_filter_respected() {
        let store = MemoryStore::new(vec![
            txn("John Smith", (2023, 8, 1), dec!(10000), "Loan advance"),
            txn("John Smith", (2024, 8, 1), dec!(5000), "Loan advance"),
        ]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let options = AnalysisOptions {
            from_year: Some("FY2024-25".parse().unwrap()),
            ..Default::default()
        };
        let summary = engine.analyze("tenant-1", &options);
        assert_eq!(summary.total_loan_balance, dec!(5000));
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let store = MemoryStore::new(vec![txn(
            "John Smith",
            (2024, 8, 1),
            dec!(10000),
            "Loan advance",
        )]);
        let clock = clock();
        let engine = Div7aEngine::new(&store, None, &clock);
        let summary = engine.analyze("tenant-1", &AnalysisOptions::default());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total_loans"], 1);
        assert_eq!(json["tax_rate_source"], "historical");
        assert_eq!(json["loan_analyses"][0]["has_written_agreement"], "unknown");
    }
}
