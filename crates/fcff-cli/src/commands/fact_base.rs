use clap::Args;
use serde::de::DeserializeOwned;
use serde_json::Value;

use fcff_core::fact_base::{extract_fact_base, FundamentalRecord, PricePoint};

use crate::input::file::resolve_path;

/// Arguments for building a fact base from CSV exports
#[derive(Args)]
pub struct FactBaseArgs {
    /// Company identifier (ticker or name)
    #[arg(long)]
    pub company: String,

    /// Fiscal-year label of the base year, as it appears in the fundamentals file
    #[arg(long)]
    pub fiscal_year: String,

    /// CSV with columns field,fiscal_year,reporting_date,value
    #[arg(long)]
    pub fundamentals: String,

    /// CSV with columns date,close
    #[arg(long)]
    pub prices: String,
}

pub fn run_fact_base(args: FactBaseArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let records: Vec<FundamentalRecord> = read_csv(&args.fundamentals)?;
    let prices: Vec<PricePoint> = read_csv(&args.prices)?;
    tracing::debug!(
        records = records.len(),
        prices = prices.len(),
        "loaded fundamentals and price history"
    );
    let fact_base = extract_fact_base(&args.company, &args.fiscal_year, &records, &prices)?;
    Ok(serde_json::to_value(fact_base)?)
}

fn read_csv<T: DeserializeOwned>(path: &str) -> Result<Vec<T>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: T = row.map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
        rows.push(row);
    }
    Ok(rows)
}
