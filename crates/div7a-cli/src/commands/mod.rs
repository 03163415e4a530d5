pub mod analyze;
pub mod rates;
pub mod schedule;
