mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analyze::AnalyzeArgs;
use commands::rates::RateArgs;
use commands::schedule::ScheduleArgs;

/// Division 7A shareholder loan compliance analysis
#[derive(Parser)]
#[command(
    name = "div7a",
    version,
    about = "Division 7A shareholder loan compliance analysis",
    long_about = "Reconstructs shareholder loan positions from categorized transaction \
                  data and evaluates them against Division 7A of the ITAA 1936 with \
                  decimal precision. Supports full tenant analysis, benchmark rate \
                  lookup, and minimum repayment schedules."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a tenant's flagged transactions for Division 7A exposure
    Analyze(AnalyzeArgs),
    /// Look up the Division 7A benchmark interest rate for a financial year
    Rate(RateArgs),
    /// Generate a minimum yearly repayment schedule (s 109E)
    Schedule(ScheduleArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::Rate(args) => commands::rates::run_rate(args),
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::Version => {
            println!("div7a {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
