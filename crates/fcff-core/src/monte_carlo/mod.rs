pub mod sampler;
pub mod simulation;
pub mod statistics;

pub use sampler::{sample, DistributionKind, ParameterConfig, SamplingConfig};
pub use simulation::{run_monte_carlo, run_valuation_simulation, McValuationInput, McValuationOutput};
pub use statistics::{summarize_fair_values, FairValueSummary};
