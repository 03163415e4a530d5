pub mod div7a;
pub mod error;
pub mod fy;
pub mod rates;
pub mod store;
pub mod types;

pub use error::TaxEngineError;
pub use types::*;

/// Standard result type for all engine operations
pub type TaxEngineResult<T> = Result<T, TaxEngineError>;
