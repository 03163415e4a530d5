use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use div7a_core::div7a::{
    minimum_repayment_schedule, ScheduleInput, UNSECURED_LOAN_TERM_YEARS,
};
use div7a_core::fy::{Clock, FinancialYear, SystemClock};
use div7a_core::rates::benchmark_rate_for;

use crate::input;

/// Arguments for a minimum repayment schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file with schedule parameters
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal at the start of the first income year
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual benchmark rate as a decimal, e.g. 0.0877
    /// (defaults to the current year's rate)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long, default_value_t = UNSECURED_LOAN_TERM_YEARS)]
    pub term_years: u32,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let annual_rate = match args.rate {
            Some(rate) => rate,
            None => {
                let current = FinancialYear::from_date(SystemClock.today());
                benchmark_rate_for(current, current, None).rate
            }
        };
        ScheduleInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate,
            term_years: args.term_years,
        }
    };

    let output = minimum_repayment_schedule(&schedule_input)?;
    Ok(serde_json::to_value(output)?)
}
