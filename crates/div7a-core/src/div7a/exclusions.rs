//! Amalgamation warnings (s 109E(8)) and safe-harbour exclusions
//! (s 109RB). Both are advisory: they annotate the result set and never
//! alter a reconstructed balance.

use serde::{Deserialize, Serialize};

use crate::div7a::evaluation::Division7aAnalysis;
use crate::div7a::loans::{normalize_shareholder_key, LoanFact, LoanMovement};
use crate::types::Money;
use chrono::NaiveDate;

/// Payment categories statutorily excluded from Division 7A treatment.
const SAFE_HARBOUR_KEYWORDS: &[&str] = &[
    "salary",
    "wages",
    "director fee",
    "directors fee",
    "director's fee",
    "superannuation",
];

/// A transaction matching a safe-harbour category, surfaced for manual
/// reclassification. The movement stays in the loan balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeHarbourExclusion {
    pub shareholder: String,
    pub keyword: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub note: String,
}

/// Scan every loan's movements for safe-harbour descriptions.
pub fn detect_safe_harbour(facts: &[LoanFact]) -> Vec<SafeHarbourExclusion> {
    let mut exclusions = Vec::new();
    for fact in facts {
        for movement in &fact.movements {
            if let Some(keyword) = match_safe_harbour(movement) {
                exclusions.push(SafeHarbourExclusion {
                    shareholder: fact.shareholder.clone(),
                    keyword: keyword.to_string(),
                    amount: movement.amount,
                    date: movement.date,
                    note: format!(
                        "Description matches '{keyword}': salary and wage payments are \
                         excluded from Division 7A treatment under s 109RB; review and \
                         reclassify manually"
                    ),
                });
            }
        }
    }
    exclusions
}

fn match_safe_harbour(movement: &LoanMovement) -> Option<&'static str> {
    let lowered = movement.description.to_lowercase();
    SAFE_HARBOUR_KEYWORDS
        .iter()
        .find(|k| lowered.contains(*k))
        .copied()
}

/// Second pass over the finished analyses: warn when two or more resolve
/// to the same shareholder key. With exact-name grouping upstream this
/// only fires on near-duplicate name variants that a future entity
/// resolution step would merge.
pub fn detect_amalgamation(analyses: &[Division7aAnalysis]) -> (bool, Vec<String>) {
    let mut counts: std::collections::BTreeMap<String, (String, u32)> =
        std::collections::BTreeMap::new();
    for analysis in analyses {
        let key = normalize_shareholder_key(&analysis.shareholder);
        let entry = counts
            .entry(key)
            .or_insert_with(|| (analysis.shareholder.clone(), 0));
        entry.1 += 1;
    }

    let notes: Vec<String> = counts
        .values()
        .filter(|(_, count)| *count >= 2)
        .map(|(name, count)| {
            format!(
                "{count} separate loan analyses resolve to shareholder '{name}': \
                 s 109E(8) treats multiple loans to the same shareholder as a single \
                 amalgamated loan for minimum repayment purposes"
            )
        })
        .collect();

    (!notes.is_empty(), notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::div7a::confidence::ClassificationScore;
    use crate::div7a::evaluation::evaluate_loan;
    use crate::div7a::loans::MovementKind;
    use crate::rates::{BenchmarkRate, RateSource};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn movement(description: &str, amount: Money) -> LoanMovement {
        LoanMovement {
            date: NaiveDate::from_ymd_opt(2024, 9, 15).unwrap(),
            kind: MovementKind::Advance,
            amount,
            description: description.to_string(),
            account_type: None,
            account_name: None,
        }
    }

    fn fact_with(description: &str) -> LoanFact {
        LoanFact {
            shareholder: "John Smith".to_string(),
            opening_balance: Decimal::ZERO,
            movements: vec![movement(description, dec!(5000))],
            closing_balance: dec!(5000),
            notes: vec![],
        }
    }

    fn make_analysis(shareholder: &str) -> Division7aAnalysis {
        let fact = LoanFact {
            shareholder: shareholder.to_string(),
            opening_balance: Decimal::ZERO,
            movements: vec![],
            closing_balance: dec!(10000),
            notes: vec![],
        };
        let rate = BenchmarkRate {
            rate: dec!(0.0877),
            source: RateSource::Historical,
            financial_year: "FY2024-25".parse().unwrap(),
        };
        let score = ClassificationScore {
            confidence: 50,
            signals: vec![],
        };
        evaluate_loan(&fact, &rate, None, score).unwrap()
    }

    #[test]
    fn test_salary_description_flagged() {
        let exclusions = detect_safe_harbour(&[fact_with("Monthly salary payment")]);
        assert_eq!(exclusions.len(), 1);
        assert_eq!(exclusions[0].keyword, "salary");
        assert!(exclusions[0].note.contains("s 109RB"));
    }

    #[test]
    fn test_director_fee_flagged() {
        let exclusions = detect_safe_harbour(&[fact_with("Director fee Q2")]);
        assert_eq!(exclusions.len(), 1);
        assert_eq!(exclusions[0].keyword, "director fee");
    }

    #[test]
    fn test_loan_advance_not_flagged() {
        let exclusions = detect_safe_harbour(&[fact_with("Loan advance to director")]);
        assert!(exclusions.is_empty());
    }

    #[test]
    fn test_exclusion_records_amount_and_shareholder() {
        let exclusions = detect_safe_harbour(&[fact_with("Wages for June")]);
        assert_eq!(exclusions[0].amount, dec!(5000));
        assert_eq!(exclusions[0].shareholder, "John Smith");
    }

    #[test]
    fn test_no_amalgamation_for_distinct_shareholders() {
        let analyses = vec![make_analysis("John Smith"), make_analysis("Jane Doe")];
        let (warn, notes) = detect_amalgamation(&analyses);
        assert!(!warn);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_amalgamation_fires_on_duplicate_key() {
        let analyses = vec![make_analysis("John Smith"), make_analysis("JOHN SMITH")];
        let (warn, notes) = detect_amalgamation(&analyses);
        assert!(warn);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("s 109E(8)"));
    }

    #[test]
    fn test_amalgamation_empty_input() {
        let (warn, notes) = detect_amalgamation(&[]);
        assert!(!warn);
        assert!(notes.is_empty());
    }
}
