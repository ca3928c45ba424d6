pub mod fact_base;
pub mod monte_carlo;
pub mod valuation;
