use clap::Args;
use serde_json::Value;

use div7a_core::fy::{Clock, FinancialYear, SystemClock};
use div7a_core::rates::benchmark_rate_for;

/// Arguments for benchmark rate lookup
#[derive(Args)]
pub struct RateArgs {
    /// Financial year, e.g. FY2024-25 (defaults to the current year)
    #[arg(long)]
    pub year: Option<String>,
}

pub fn run_rate(args: RateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let current = FinancialYear::from_date(SystemClock.today());
    let fy = match args.year {
        Some(s) => s.parse()?,
        None => current,
    };

    let rate = benchmark_rate_for(fy, current, None);
    Ok(serde_json::to_value(rate)?)
}
