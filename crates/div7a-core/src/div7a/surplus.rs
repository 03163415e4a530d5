//! Distributable surplus cap (s 109Y): the total amount taken to be a
//! dividend in a year cannot exceed the company's distributable surplus.
//! The cap is applied to the aggregate exposure, not per loan.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::div7a::evaluation::Division7aAnalysis;
use crate::types::Money;

/// Where the surplus figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurplusSource {
    /// Supplied by the caller.
    Provided,
    /// Derived by the data layer from balance-sheet signals.
    Estimated,
    /// No figure available; no cap applied.
    Unknown,
}

/// Capped and uncapped aggregate exposure across all loans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureCap {
    pub total_deemed_dividend_risk: Money,
    pub total_potential_tax_liability: Money,
    pub capped_total_deemed_dividend_risk: Money,
    pub capped_total_potential_tax_liability: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributable_surplus: Option<Money>,
    pub distributable_surplus_source: SurplusSource,
}

/// Cap the aggregate deemed-dividend exposure at the distributable
/// surplus. When no surplus is known the capped totals equal the
/// uncapped totals. The tax liability is scaled by the same ratio as the
/// dividend exposure so the two stay consistent.
pub fn cap_exposure(
    analyses: &[Division7aAnalysis],
    surplus: Option<(Money, SurplusSource)>,
) -> ExposureCap {
    let total_risk: Money = analyses
        .iter()
        .map(|a| a.scenario_without_agreement.deemed_dividend_amount)
        .sum();
    let total_tax: Money = analyses
        .iter()
        .map(|a| a.scenario_without_agreement.potential_tax_liability)
        .sum();

    let (surplus_amount, source) = match surplus {
        Some((amount, source)) => (Some(amount.max(Decimal::ZERO)), source),
        None => (None, SurplusSource::Unknown),
    };

    let (capped_risk, capped_tax) = match surplus_amount {
        Some(cap) if total_risk > cap => {
            // total_risk > cap >= 0 implies total_risk > 0
            let ratio = cap / total_risk;
            (
                cap,
                (total_tax * ratio).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            )
        }
        _ => (total_risk, total_tax),
    };

    ExposureCap {
        total_deemed_dividend_risk: total_risk,
        total_potential_tax_liability: total_tax,
        capped_total_deemed_dividend_risk: capped_risk,
        capped_total_potential_tax_liability: capped_tax,
        distributable_surplus: surplus_amount,
        distributable_surplus_source: source,
    }
}
