use std::collections::HashMap;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use div7a_core::div7a::{AnalysisOptions, Div7aEngine};
use div7a_core::fy::{Clock, FinancialYear, FixedClock, SystemClock};
use div7a_core::store::MemoryStore;
use div7a_core::types::Transaction;

use crate::input;

/// Arguments for a full Division 7A tenant analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON input file with transactions and balances
    #[arg(long)]
    pub input: Option<String>,

    /// Tenant identifier the transactions belong to
    #[arg(long, default_value = "default")]
    pub tenant: String,

    /// First financial year to include, e.g. FY2023-24
    #[arg(long)]
    pub from_year: Option<String>,

    /// Last financial year to include, e.g. FY2024-25
    #[arg(long)]
    pub to_year: Option<String>,

    /// Distributable surplus (s 109Y) to cap aggregate exposure at
    #[arg(long)]
    pub distributable_surplus: Option<Decimal>,

    /// Known company officer name (repeatable)
    #[arg(long = "officer")]
    pub officers: Vec<String>,

    /// Override "today" for deterministic runs, e.g. 2025-03-01
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

/// JSON input shape for `analyze`.
#[derive(Deserialize)]
struct AnalyzeInput {
    transactions: Vec<Transaction>,
    /// Prior-year closing balances keyed by shareholder name.
    #[serde(default)]
    opening_balances: HashMap<String, Decimal>,
    #[serde(default)]
    distributable_surplus: Option<Decimal>,
    #[serde(default)]
    known_officers: Vec<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data: AnalyzeInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input is required (or pipe JSON to stdin)".into());
    };

    let mut store = MemoryStore::new(data.transactions);
    for (shareholder, balance) in &data.opening_balances {
        store = store.with_opening_balance(shareholder, *balance);
    }
    if let Some(surplus) = data.distributable_surplus {
        store = store.with_surplus_estimate(surplus);
    }

    let mut known_officers = data.known_officers;
    known_officers.extend(args.officers);

    let options = AnalysisOptions {
        from_year: parse_year(args.from_year.as_deref())?,
        to_year: parse_year(args.to_year.as_deref())?,
        known_distributable_surplus: args.distributable_surplus,
        known_officers,
    };

    let clock: Box<dyn Clock> = match args.today {
        Some(date) => Box::new(FixedClock(date)),
        None => Box::new(SystemClock),
    };
    let engine = Div7aEngine::new(&store, None, clock.as_ref());
    let summary = engine.analyze(&args.tenant, &options);

    Ok(serde_json::to_value(summary)?)
}

fn parse_year(value: Option<&str>) -> Result<Option<FinancialYear>, Box<dyn std::error::Error>> {
    match value {
        Some(s) => Ok(Some(s.parse()?)),
        None => Ok(None),
    }
}
