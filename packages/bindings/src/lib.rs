use napi::Result as NapiResult;
use napi_derive::napi;

use div7a_core::div7a::{AnalysisOptions, Div7aEngine};
use div7a_core::fy::{Clock, FinancialYear, FixedClock, SystemClock};
use div7a_core::store::MemoryStore;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Division 7A analysis
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct AnalyzeBindingInput {
    tenant_id: String,
    transactions: Vec<div7a_core::types::Transaction>,
    #[serde(default)]
    opening_balances: std::collections::HashMap<String, rust_decimal::Decimal>,
    #[serde(default)]
    distributable_surplus: Option<rust_decimal::Decimal>,
    #[serde(flatten)]
    options: AnalysisOptions,
    /// ISO date overriding "today", for deterministic output.
    #[serde(default)]
    today: Option<chrono::NaiveDate>,
}

#[napi]
pub fn analyze_div7a(input_json: String) -> NapiResult<String> {
    let input: AnalyzeBindingInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;

    let mut store = MemoryStore::new(input.transactions);
    for (shareholder, balance) in &input.opening_balances {
        store = store.with_opening_balance(shareholder, *balance);
    }
    if let Some(surplus) = input.distributable_surplus {
        store = store.with_surplus_estimate(surplus);
    }

    let clock: Box<dyn Clock> = match input.today {
        Some(date) => Box::new(FixedClock(date)),
        None => Box::new(SystemClock),
    };
    let engine = Div7aEngine::new(&store, None, clock.as_ref());
    let summary = engine.analyze(&input.tenant_id, &input.options);
    serde_json::to_string(&summary).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Benchmark rate
// ---------------------------------------------------------------------------

#[napi]
pub fn benchmark_rate(financial_year: Option<String>) -> NapiResult<String> {
    let current = FinancialYear::from_date(SystemClock.today());
    let fy = match financial_year {
        Some(s) => s.parse().map_err(to_napi_error)?,
        None => current,
    };
    let rate = div7a_core::rates::benchmark_rate_for(fy, current, None);
    serde_json::to_string(&rate).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Repayment schedule
// ---------------------------------------------------------------------------

#[napi]
pub fn minimum_repayment_schedule(input_json: String) -> NapiResult<String> {
    let input: div7a_core::div7a::ScheduleInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = div7a_core::div7a::minimum_repayment_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
