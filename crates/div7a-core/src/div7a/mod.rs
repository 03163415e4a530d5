//! Division 7A shareholder-loan compliance engine.
//!
//! Pipeline: transactions → loan reconstruction → (per loan) confidence
//! scoring + rate resolution → compliance evaluation → amalgamation and
//! safe-harbour detection → distributable surplus cap → summary.

pub mod confidence;
pub mod evaluation;
pub mod exclusions;
pub mod loans;
pub mod summary;
pub mod surplus;

pub use confidence::{score_classification, ClassificationScore};
pub use evaluation::{
    evaluate_loan, minimum_repayment_schedule, minimum_yearly_repayment, AgreementStatus,
    Division7aAnalysis, RiskLevel, ScheduleInput, UNSECURED_LOAN_TERM_YEARS,
};
pub use exclusions::{detect_amalgamation, detect_safe_harbour, SafeHarbourExclusion};
pub use loans::{group_transactions_into_loans, LoanFact, LoanMovement, MovementKind};
pub use summary::{AnalysisOptions, Div7aEngine, Div7aSummary};
pub use surplus::{cap_exposure, ExposureCap, SurplusSource};
