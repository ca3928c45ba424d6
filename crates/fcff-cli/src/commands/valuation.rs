use clap::Args;
use serde_json::Value;

use fcff_core::valuation::{self, ValuationInput};

use crate::input;

/// Arguments shared by the deterministic valuation commands
#[derive(Args)]
pub struct ScenarioArgs {
    /// Path to a JSON/YAML file with `fact_base` and `assumptions`
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a single-scenario valuation
#[derive(Args)]
pub struct ValueArgs {
    /// Path to a JSON/YAML file with `fact_base` and `assumptions`
    #[arg(long)]
    pub input: Option<String>,

    /// Include the forecast and ROIC tables in the result
    #[arg(long)]
    pub full: bool,
}

pub fn run_forecast(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: ValuationInput = input::require(args.input.as_deref(), "forecast")?;
    let series = valuation::forecast(&scenario.fact_base, &scenario.assumptions)?;
    Ok(serde_json::to_value(series.rows())?)
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: ValuationInput = input::require(args.input.as_deref(), "value")?;
    let output = valuation::value_company(&scenario)?;
    let mut value = serde_json::to_value(output)?;
    if !args.full {
        // Keep the envelope, narrow the result to the equity bridge
        if let Some(result) = value.get_mut("result") {
            let bridge = result.get("valuation").cloned().unwrap_or(Value::Null);
            *result = bridge;
        }
    }
    Ok(value)
}

pub fn run_roic(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let scenario: ValuationInput = input::require(args.input.as_deref(), "roic")?;
    let series = valuation::forecast(&scenario.fact_base, &scenario.assumptions)?;
    let roic = valuation::track_roic(&scenario.fact_base, &series)?;
    Ok(serde_json::to_value(roic.rows())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Terminal WACC equal to terminal growth: projectable, but not valuable.
    fn write_scenario(name: &str) -> String {
        let scenario = serde_json::json!({
            "fact_base": {
                "company": "TEST",
                "base_revenue": 1000,
                "base_ebit": 200,
                "base_tax_rate": 0.21,
                "cash": 100,
                "total_debt": 300,
                "shares_outstanding": 50,
                "invested_capital": 800,
                "anchor_date": "2024-12-31",
                "market_reference_date": "2025-02-03",
                "market_price": 40
            },
            "assumptions": {
                "revenue_growth": [0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.03],
                "operating_margin": [0.2, 0.2, 0.2, 0.2, 0.2, 0.2, 0.2, 0.2, 0.2, 0.2, 0.2],
                "tax_rate": [0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25, 0.25],
                "reinvestment_rate": [2, 2, 2, 2, 2, 2, 2, 2, 2, 2],
                "wacc": [0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.03],
                "roic_tv": 0.15
            }
        });
        let path = std::env::temp_dir().join(format!("fcff-cli-{}-{name}.json", std::process::id()));
        fs::write(&path, scenario.to_string()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_forecast_and_roic_skip_gordon_check() {
        let path = write_scenario("tables");

        let forecast = run_forecast(ScenarioArgs { input: Some(path.clone()) }).unwrap();
        assert_eq!(forecast.as_array().map(Vec::len), Some(12));
        let roic = run_roic(ScenarioArgs { input: Some(path.clone()) }).unwrap();
        assert_eq!(roic.as_array().map(Vec::len), Some(12));

        let value = run_value(ValueArgs { input: Some(path.clone()), full: false });
        assert!(value.unwrap_err().to_string().contains("Gordon"));

        fs::remove_file(path).unwrap();
    }
}
