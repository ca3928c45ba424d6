pub mod assumptions;
pub mod error;
pub mod fact_base;
pub mod period;
pub mod time_value;
pub mod types;
pub mod valuation;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::FcffError;
pub use types::*;

/// Standard result type for all valuation operations
pub type FcffResult<T> = Result<T, FcffError>;
