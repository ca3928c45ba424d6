use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::AssumptionSet;
use crate::error::FcffError;
use crate::fact_base::FactBase;
use crate::time_value::{checked_add, checked_div, checked_mul, checked_sub};
use crate::types::{with_metadata, ComputationOutput, MarketQuote, Money, Rate, PRECISION_DECIMAL};
use crate::FcffResult;

use super::forecast::{forecast, ForecastSeries};
use super::roic::{track_roic, RoicSeries, ROLL_FORWARD_YEARS};

/// Terminal-value share of firm value above which a warning is raised.
const TV_SHARE_WARNING: Rate = dec!(0.75);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Firm-to-equity bridge and per-share fair value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Sum of discounted FCFF, years 1..=10
    pub sum_discounted_fcff: Money,
    /// Terminal EBIT after tax less terminal reinvestment
    pub tv_fcff: Money,
    /// Gordon growth value at the end of year 10
    pub terminal_value: Money,
    pub discounted_terminal_value: Money,
    pub total_firm_value: Money,
    pub total_debt: Money,
    pub cash: Money,
    pub equity_value: Money,
    pub shares_outstanding: Decimal,
    pub fair_value_per_share: Money,
    /// Comparison price and the date it was observed
    pub market: MarketQuote,
    /// `fair_value / market_price - 1`; absent when the price is zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upside_to_market: Option<Rate>,
    /// Discounted terminal value as a fraction of total firm value
    pub terminal_value_pct: Rate,
}

/// Input for the full single-scenario valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationInput {
    pub fact_base: FactBase,
    pub assumptions: AssumptionSet,
}

/// Forecast, valuation and ROIC for one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationReport {
    pub forecast: ForecastSeries,
    pub valuation: ValuationResult,
    pub roic: RoicSeries,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Discount the forecast, capitalize the terminal period and bridge firm
/// value to a per-share equity value.
pub fn valuate(fact_base: &FactBase, forecast: &ForecastSeries) -> FcffResult<ValuationResult> {
    forecast.validate()?;
    let terminal = &forecast.terminal;
    let wacc_tv = terminal.wacc;
    let growth_tv = terminal.revenue_growth;
    if wacc_tv <= growth_tv {
        return Err(FcffError::FinancialImpossibility(format!(
            "Terminal growth rate ({growth_tv}) must be less than terminal WACC ({wacc_tv}) for the Gordon growth model"
        )));
    }
    if fact_base.shares_outstanding <= Decimal::ZERO {
        return Err(FcffError::InvalidInput {
            field: "shares_outstanding".into(),
            reason: "Shares outstanding must be positive".into(),
        });
    }

    let sum_discounted_fcff = forecast
        .years
        .iter()
        .try_fold(Decimal::ZERO, |acc, y| {
            checked_add(acc, y.discounted_fcff, &format!("sum of discounted FCFF at {}", y.period))
        })?;

    // --- Terminal value ---
    let tv_fcff = checked_sub(terminal.ebit_after_tax, terminal.reinvestment, "terminal FCFF")?;
    let terminal_value = checked_div(tv_fcff, wacc_tv - growth_tv, "terminal value (WACC - growth)")?;
    let discounted_terminal_value = checked_mul(
        terminal_value,
        forecast.final_discount_factor()?,
        "discounted terminal value",
    )?;

    // --- Equity bridge ---
    let total_firm_value =
        checked_add(sum_discounted_fcff, discounted_terminal_value, "total firm value")?;
    let equity_value = checked_add(
        checked_sub(total_firm_value, fact_base.total_debt, "equity value")?,
        fact_base.cash,
        "equity value",
    )?;
    let fair_value_per_share =
        checked_div(equity_value, fact_base.shares_outstanding, "fair value per share")?;

    let terminal_value_pct = if total_firm_value.is_zero() {
        Decimal::ZERO
    } else {
        checked_div(discounted_terminal_value, total_firm_value, "terminal value share")?
    };
    let upside_to_market = if fact_base.market_price.is_zero() {
        None
    } else {
        Some(checked_div(fair_value_per_share, fact_base.market_price, "upside to market")? - Decimal::ONE)
    };

    tracing::debug!(
        company = %fact_base.company,
        firm_value = %total_firm_value,
        fair_value_per_share = %fair_value_per_share,
        "valuation complete"
    );

    Ok(ValuationResult {
        sum_discounted_fcff,
        tv_fcff,
        terminal_value,
        discounted_terminal_value,
        total_firm_value,
        total_debt: fact_base.total_debt,
        cash: fact_base.cash,
        equity_value,
        shares_outstanding: fact_base.shares_outstanding,
        fair_value_per_share,
        market: fact_base.market_quote(),
        upside_to_market,
        terminal_value_pct,
    })
}

/// Forecast then valuate a single assumption set.
pub fn value_assumptions(
    fact_base: &FactBase,
    assumptions: &AssumptionSet,
) -> FcffResult<ValuationResult> {
    let series = forecast(fact_base, assumptions)?;
    valuate(fact_base, &series)
}

/// Full single-scenario valuation wrapped in the computation envelope.
pub fn value_company(input: &ValuationInput) -> FcffResult<ComputationOutput<ValuationReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.assumptions.validate()?;

    let series = forecast(&input.fact_base, &input.assumptions)?;
    let valuation = valuate(&input.fact_base, &series)?;
    let roic = track_roic(&input.fact_base, &series)?;

    if valuation.terminal_value_pct > TV_SHARE_WARNING {
        tracing::warn!(
            company = %input.fact_base.company,
            terminal_value_pct = %valuation.terminal_value_pct,
            "terminal value dominates firm value"
        );
        warnings.push(format!(
            "Terminal value represents {:.1}% of total firm value",
            valuation.terminal_value_pct * dec!(100)
        ));
    }
    if valuation.equity_value < Decimal::ZERO {
        warnings.push(format!(
            "Equity value is negative ({:.0}): debt exceeds firm value plus cash",
            valuation.equity_value
        ));
    }
    warnings.push(format!(
        "Invested capital is rolled forward for years 1-{ROLL_FORWARD_YEARS} only; Year 10 ROIC is not reported"
    ));

    let report = ValuationReport {
        forecast: series,
        valuation,
        roic,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "10-Year FCFF DCF (reinvestment-rate, Gordon terminal value)",
        input,
        warnings,
        elapsed,
        PRECISION_DECIMAL,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
