//! Compliance evaluation: minimum yearly repayment, the two statutory
//! scenarios (with / without a complying agreement), risk grading and
//! remediation guidance.

use std::time::Instant;

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::div7a::confidence::ClassificationScore;
use crate::div7a::loans::LoanFact;
use crate::error::TaxEngineError;
use crate::rates::BenchmarkRate;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::TaxEngineResult;

/// Statutory maximum term for an unsecured complying loan (s 109N).
pub const UNSECURED_LOAN_TERM_YEARS: u32 = 7;

/// Statutory maximum term for a loan secured by a registered mortgage.
pub const SECURED_LOAN_TERM_YEARS: u32 = 25;

/// Illustrative resident marginal brackets used for the fixed 4-entry
/// tax-scenario array.
pub const MARGINAL_TAX_BRACKETS: &[(&str, Decimal)] = &[
    ("$18,201 – $45,000", dec!(0.16)),
    ("$45,001 – $135,000", dec!(0.30)),
    ("$135,001 – $190,000", dec!(0.37)),
    ("$190,001 and over", dec!(0.45)),
];

/// Worst-case marginal rate used for the headline liability figure.
const TOP_MARGINAL_RATE: Decimal = dec!(0.45);

const NEGLIGIBLE_BALANCE: Decimal = dec!(1000);
const MEDIUM_RISK_BALANCE: Decimal = dec!(20000);
const CRITICAL_RISK_BALANCE: Decimal = dec!(100000);

/// Whether a complying written loan agreement exists. This engine can
/// never observe agreement existence from transaction data, so it always
/// emits `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgreementStatus {
    Yes,
    No,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Outcome assuming a complying written agreement is in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementScenario {
    pub minimum_repayment_required: Money,
    /// Interest-only component at the benchmark rate.
    pub benchmark_interest_required: Money,
    /// Repayments observed in the transaction data, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_repayment: Option<Money>,
    pub is_compliant: bool,
}

/// Outcome assuming no complying agreement exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoAgreementScenario {
    pub deemed_dividend_amount: Money,
    /// At the top marginal rate; per-bracket figures are in `tax_scenarios`.
    pub potential_tax_liability: Money,
    pub legal_basis: String,
}

/// Illustrative liability at one marginal bracket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxScenario {
    pub bracket: String,
    pub marginal_rate: Rate,
    pub tax_liability: Money,
}

/// Full per-loan compliance finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Division7aAnalysis {
    pub shareholder: String,
    pub opening_balance: Money,
    pub closing_balance: Money,
    pub benchmark_rate: BenchmarkRate,
    pub has_written_agreement: AgreementStatus,
    pub agreement_note: String,
    pub scenario_with_agreement: AgreementScenario,
    pub scenario_without_agreement: NoAgreementScenario,
    pub classification_confidence: u32,
    pub classification_signals: Vec<String>,
    pub risk_level: RiskLevel,
    pub compliance_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub corrective_actions: Vec<String>,
    pub tax_scenarios: Vec<TaxScenario>,
    pub notes: Vec<String>,
}

fn round2(value: Money) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Minimum yearly repayment on an amortizing annuity:
/// `balance * rate / (1 - (1 + rate)^-term)`.
pub fn minimum_yearly_repayment(balance: Money, rate: Rate, term_years: u32) -> TaxEngineResult<Money> {
    if term_years == 0 {
        return Err(TaxEngineError::InvalidInput {
            field: "term_years".into(),
            reason: "Loan term must be at least one year".into(),
        });
    }
    if balance < Decimal::ZERO {
        return Err(TaxEngineError::InvalidInput {
            field: "balance".into(),
            reason: "Loan balance cannot be negative".into(),
        });
    }
    if rate < Decimal::ZERO {
        return Err(TaxEngineError::InvalidInput {
            field: "rate".into(),
            reason: "Benchmark rate cannot be negative".into(),
        });
    }

    if balance.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if rate.is_zero() {
        return Ok(round2(balance / Decimal::from(term_years)));
    }

    let factor = (Decimal::ONE + rate).powd(Decimal::from(term_years));
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(TaxEngineError::DivisionByZero {
            context: "minimum repayment annuity factor".into(),
        });
    }

    Ok(round2(balance * rate * factor / denominator))
}

/// Interest-only component at the benchmark rate.
pub fn benchmark_interest(balance: Money, rate: Rate) -> Money {
    round2(balance * rate)
}

fn derive_risk_level(closing_balance: Money, is_compliant: bool) -> RiskLevel {
    if closing_balance <= NEGLIGIBLE_BALANCE {
        return RiskLevel::Low;
    }
    if !is_compliant && closing_balance >= CRITICAL_RISK_BALANCE {
        return RiskLevel::Critical;
    }
    if !is_compliant || closing_balance >= CRITICAL_RISK_BALANCE {
        return RiskLevel::High;
    }
    if closing_balance >= MEDIUM_RISK_BALANCE {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

/// Evaluate one reconstructed loan against both statutory scenarios.
///
/// When `actual_repayment` is `None` the with-agreement scenario assumes
/// the minimum was exactly met: the engine cannot observe repayments
/// beyond what is in the transaction data.
pub fn evaluate_loan(
    fact: &LoanFact,
    rate: &BenchmarkRate,
    actual_repayment: Option<Money>,
    score: ClassificationScore,
) -> TaxEngineResult<Division7aAnalysis> {
    let balance = fact.closing_balance;
    let minimum = minimum_yearly_repayment(balance, rate.rate, UNSECURED_LOAN_TERM_YEARS)?;
    let interest = benchmark_interest(balance, rate.rate);

    let is_compliant = actual_repayment.map_or(true, |paid| paid >= minimum);

    // Invariant: 0 <= deemed dividend <= closing balance. The reconstructor
    // already floors the balance at zero.
    let deemed = balance;
    let potential_tax = round2(deemed * TOP_MARGINAL_RATE);

    let tax_scenarios = MARGINAL_TAX_BRACKETS
        .iter()
        .map(|(bracket, marginal_rate)| TaxScenario {
            bracket: (*bracket).to_string(),
            marginal_rate: *marginal_rate,
            tax_liability: round2(deemed * *marginal_rate),
        })
        .collect();

    let mut compliance_issues = Vec::new();
    let mut recommendations = Vec::new();
    let mut corrective_actions = Vec::new();

    if balance > Decimal::ZERO {
        compliance_issues.push(
            "Written loan agreement status unverified: s 109N compliance cannot be \
             confirmed from transaction data"
                .to_string(),
        );
        recommendations.push(format!(
            "Put a complying written loan agreement (s 109N) in place before the \
             company's lodgment day; charge interest at the benchmark rate of {}",
            rate.rate
        ));
        corrective_actions.push("Execute a complying written loan agreement".to_string());
    }

    if !is_compliant {
        let shortfall = round2(minimum - actual_repayment.unwrap_or(Decimal::ZERO));
        compliance_issues.push(format!(
            "Observed repayments are below the minimum yearly repayment of {minimum} \
             by {shortfall} (s 109E)"
        ));
        recommendations.push(format!(
            "Make a catch-up repayment of at least {shortfall} before 30 June"
        ));
        corrective_actions
            .push("Repay the shortfall before the company's lodgment day".to_string());
        corrective_actions.push(
            "If repayment is not possible, consider declaring a franked dividend to \
             offset the deemed dividend"
                .to_string(),
        );
    }

    Ok(Division7aAnalysis {
        shareholder: fact.shareholder.clone(),
        opening_balance: fact.opening_balance,
        closing_balance: balance,
        benchmark_rate: rate.clone(),
        has_written_agreement: AgreementStatus::Unknown,
        agreement_note: "Existence of a complying written loan agreement cannot be \
                         determined from transaction data; verify manually against \
                         the company's records"
            .to_string(),
        scenario_with_agreement: AgreementScenario {
            minimum_repayment_required: minimum,
            benchmark_interest_required: interest,
            actual_repayment,
            is_compliant,
        },
        scenario_without_agreement: NoAgreementScenario {
            deemed_dividend_amount: deemed,
            potential_tax_liability: potential_tax,
            legal_basis: "Absent a complying written agreement, the full closing balance \
                          is treated as a deemed dividend under s 109D ITAA 1936"
                .to_string(),
        },
        classification_confidence: score.confidence,
        classification_signals: score.signals,
        risk_level: derive_risk_level(balance, is_compliant),
        compliance_issues,
        recommendations,
        corrective_actions,
        tax_scenarios,
        notes: fact.notes.clone(),
    })
}

// ---------------------------------------------------------------------------
// Amortization schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub principal: Money,
    /// Decimal rate, e.g. 0.0877.
    pub annual_rate: Rate,
    #[serde(default = "default_term")]
    pub term_years: u32,
}

fn default_term() -> u32 {
    UNSECURED_LOAN_TERM_YEARS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub year: u32,
    pub opening_balance: Money,
    pub payment: Money,
    pub interest: Money,
    pub principal_repaid: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub minimum_yearly_repayment: Money,
    pub total_payments: Money,
    pub total_interest: Money,
    pub rows: Vec<ScheduleRow>,
}

/// Year-by-year amortization of the minimum repayment schedule. The final
/// year's payment is adjusted to clear the balance exactly.
pub fn minimum_repayment_schedule(
    input: &ScheduleInput,
) -> TaxEngineResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();

    if input.principal <= Decimal::ZERO {
        return Err(TaxEngineError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }

    let payment = minimum_yearly_repayment(input.principal, input.annual_rate, input.term_years)?;

    let mut rows = Vec::with_capacity(input.term_years as usize);
    let mut balance = input.principal;
    let mut total_interest = Decimal::ZERO;
    let mut total_payments = Decimal::ZERO;

    for year in 1..=input.term_years {
        let interest = round2(balance * input.annual_rate);
        let year_payment = if year == input.term_years {
            round2(balance + interest)
        } else {
            payment
        };
        let principal_repaid = round2(year_payment - interest);
        let closing = round2(balance - principal_repaid);

        rows.push(ScheduleRow {
            year,
            opening_balance: balance,
            payment: year_payment,
            interest,
            principal_repaid,
            closing_balance: closing,
        });

        total_interest += interest;
        total_payments += year_payment;
        balance = closing;
    }

    let warnings = vec![
        "Benchmark rate held constant across the term; the statutory minimum is \
         recalculated each year at that year's published rate"
            .to_string(),
    ];

    let assumptions = std::collections::HashMap::from([
        ("term_years", input.term_years.to_string()),
        ("annual_rate", input.annual_rate.to_string()),
        ("final_year", "payment adjusted to clear balance".to_string()),
    ]);

    let output = ScheduleOutput {
        minimum_yearly_repayment: payment,
        total_payments: round2(total_payments),
        total_interest: round2(total_interest),
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Division 7A minimum yearly repayment (amortizing annuity, s 109E(5))",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}
