pub mod dcf;
pub mod forecast;
pub mod roic;

pub use dcf::{value_assumptions, value_company, valuate, ValuationInput, ValuationReport, ValuationResult};
pub use forecast::{forecast, ForecastRow, ForecastSeries, YearProjection};
pub use roic::{track_roic, RoicRow, RoicSeries};
