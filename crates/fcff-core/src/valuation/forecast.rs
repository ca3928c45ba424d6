use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assumptions::AssumptionSet;
use crate::error::FcffError;
use crate::fact_base::FactBase;
use crate::period::{Period, FORECAST_YEARS};
use crate::time_value::{checked_div, checked_mul, checked_sub, cumulative_discount_factors};
use crate::types::{Money, Multiple, Rate};
use crate::FcffResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Known actuals for the base fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseYear {
    pub date: NaiveDate,
    pub revenue: Money,
    pub operating_margin: Rate,
    pub ebit: Money,
    pub tax_rate: Rate,
}

/// One explicit forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub period: Period,
    pub date: NaiveDate,
    pub revenue_growth: Rate,
    pub revenue: Money,
    pub operating_margin: Rate,
    pub ebit: Money,
    pub tax_rate: Rate,
    pub ebit_after_tax: Money,
    pub reinvestment_rate: Multiple,
    /// Next period's revenue increase divided by the reinvestment rate
    pub reinvestment: Money,
    pub fcff: Money,
    pub wacc: Rate,
    pub discount_factor: Rate,
    pub discounted_fcff: Money,
}

/// The steady-state period beyond year 10. It has no standalone FCFF or
/// discount factor: it feeds the terminal value directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalProjection {
    pub revenue_growth: Rate,
    pub revenue: Money,
    pub operating_margin: Rate,
    pub ebit: Money,
    pub tax_rate: Rate,
    pub ebit_after_tax: Money,
    /// `ebit_after_tax * growth / roic_tv`
    pub reinvestment: Money,
    pub wacc: Rate,
    pub roic_tv: Rate,
}

/// Base year, years 1..=10 and the terminal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub base: BaseYear,
    pub years: Vec<YearProjection>,
    pub terminal: TerminalProjection,
}

/// Flattened, labelled row for tabular display. Cells that do not apply to
/// a period are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub period: Period,
    pub label: String,
    pub date: Option<NaiveDate>,
    pub revenue_growth: Option<Rate>,
    pub revenue: Money,
    pub operating_margin: Rate,
    pub ebit: Money,
    pub tax_rate: Rate,
    pub ebit_after_tax: Option<Money>,
    pub reinvestment_rate: Option<Multiple>,
    pub reinvestment: Option<Money>,
    pub fcff: Option<Money>,
    pub wacc: Option<Rate>,
    pub discount_factor: Option<Rate>,
    pub discounted_fcff: Option<Money>,
}

impl ForecastSeries {
    /// Forecast year `year` (1-based).
    ///
    /// # Panics
    ///
    /// Panics if `year` is outside `1..=10`.
    pub fn year(&self, year: usize) -> &YearProjection {
        assert!(
            (1..=FORECAST_YEARS).contains(&year),
            "forecast year {year} outside 1..={FORECAST_YEARS}"
        );
        &self.years[year - 1]
    }

    /// A deserialized series must carry exactly ten forecast years.
    pub fn validate(&self) -> FcffResult<()> {
        if self.years.len() != FORECAST_YEARS {
            return Err(FcffError::InvalidInput {
                field: "forecast.years".into(),
                reason: format!(
                    "Expected {FORECAST_YEARS} forecast years, got {}",
                    self.years.len()
                ),
            });
        }
        Ok(())
    }

    /// Year-10 cumulative discount factor, used for the terminal value.
    pub fn final_discount_factor(&self) -> FcffResult<Rate> {
        self.validate()?;
        Ok(self.years[FORECAST_YEARS - 1].discount_factor)
    }

    /// All 12 periods as labelled rows.
    pub fn rows(&self) -> Vec<ForecastRow> {
        let mut rows = Vec::with_capacity(FORECAST_YEARS + 2);
        rows.push(ForecastRow {
            period: Period::Base,
            label: Period::Base.label(),
            date: Some(self.base.date),
            revenue_growth: None,
            revenue: self.base.revenue,
            operating_margin: self.base.operating_margin,
            ebit: self.base.ebit,
            tax_rate: self.base.tax_rate,
            ebit_after_tax: None,
            reinvestment_rate: None,
            reinvestment: None,
            fcff: None,
            wacc: None,
            discount_factor: None,
            discounted_fcff: None,
        });
        for y in &self.years {
            rows.push(ForecastRow {
                period: y.period,
                label: y.period.label(),
                date: Some(y.date),
                revenue_growth: Some(y.revenue_growth),
                revenue: y.revenue,
                operating_margin: y.operating_margin,
                ebit: y.ebit,
                tax_rate: y.tax_rate,
                ebit_after_tax: Some(y.ebit_after_tax),
                reinvestment_rate: Some(y.reinvestment_rate),
                reinvestment: Some(y.reinvestment),
                fcff: Some(y.fcff),
                wacc: Some(y.wacc),
                discount_factor: Some(y.discount_factor),
                discounted_fcff: Some(y.discounted_fcff),
            });
        }
        let t = &self.terminal;
        rows.push(ForecastRow {
            period: Period::Terminal,
            label: Period::Terminal.label(),
            date: None,
            revenue_growth: Some(t.revenue_growth),
            revenue: t.revenue,
            operating_margin: t.operating_margin,
            ebit: t.ebit,
            tax_rate: t.tax_rate,
            ebit_after_tax: Some(t.ebit_after_tax),
            reinvestment_rate: None,
            reinvestment: Some(t.reinvestment),
            fcff: None,
            wacc: Some(t.wacc),
            discount_factor: None,
            discounted_fcff: None,
        });
        rows
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project revenue, EBIT, reinvestment and discounted FCFF for years 1..=10
/// and the terminal period.
pub fn forecast(fact_base: &FactBase, assumptions: &AssumptionSet) -> FcffResult<ForecastSeries> {
    fact_base.validate()?;

    let dates = fact_base.period_dates()?;
    let revenues = project_revenues(fact_base.base_revenue, assumptions)?;
    let discount_factors = cumulative_discount_factors(assumptions.wacc.years())?;

    let base = BaseYear {
        date: dates[0],
        revenue: fact_base.base_revenue,
        operating_margin: fact_base.base_operating_margin()?,
        ebit: fact_base.base_ebit,
        tax_rate: fact_base.base_tax_rate,
    };

    let mut years = Vec::with_capacity(FORECAST_YEARS);
    for year in 1..=FORECAST_YEARS {
        let revenue = revenues[year];
        let operating_margin = *assumptions.operating_margin.year(year);
        let tax_rate = *assumptions.tax_rate.year(year);
        let ebit = checked_mul(revenue, operating_margin, &format!("EBIT at Year {year}"))?;
        let ebit_after_tax = checked_mul(
            ebit,
            Decimal::ONE - tax_rate,
            &format!("EBIT after tax at Year {year}"),
        )?;

        // One-step lookahead: year 10 reinvests for the terminal revenue step.
        let reinvestment_rate = assumptions.reinvestment_rate[year - 1];
        if reinvestment_rate < Decimal::ZERO {
            return Err(FcffError::InvalidInput {
                field: format!("reinvestment_rate[Year {year}]"),
                reason: format!("Reinvestment rate must be positive (got {reinvestment_rate})"),
            });
        }
        let reinvestment = checked_div(
            revenues[year + 1] - revenue,
            reinvestment_rate,
            &format!("reinvestment at Year {year} (reinvestment_rate)"),
        )?;

        let fcff = checked_sub(ebit_after_tax, reinvestment, &format!("FCFF at Year {year}"))?;
        let discount_factor = discount_factors[year - 1];
        let discounted_fcff =
            checked_mul(fcff, discount_factor, &format!("discounted FCFF at Year {year}"))?;

        years.push(YearProjection {
            period: Period::Year(year as u8),
            date: dates[year],
            revenue_growth: *assumptions.revenue_growth.year(year),
            revenue,
            operating_margin,
            ebit,
            tax_rate,
            ebit_after_tax,
            reinvestment_rate,
            reinvestment,
            fcff,
            wacc: *assumptions.wacc.year(year),
            discount_factor,
            discounted_fcff,
        });
    }

    let terminal = build_terminal(revenues[FORECAST_YEARS + 1], assumptions)?;

    tracing::debug!(
        company = %fact_base.company,
        year10_revenue = %revenues[FORECAST_YEARS],
        terminal_reinvestment = %terminal.reinvestment,
        "forecast built"
    );

    Ok(ForecastSeries {
        base,
        years,
        terminal,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Revenue for the base year (index 0), years 1..=10 and the terminal period
/// (index 11).
fn project_revenues(base_revenue: Money, assumptions: &AssumptionSet) -> FcffResult<Vec<Money>> {
    let mut revenues = Vec::with_capacity(FORECAST_YEARS + 2);
    revenues.push(base_revenue);
    let mut prev = base_revenue;
    for (period, growth) in assumptions.revenue_growth.iter() {
        let revenue = checked_mul(prev, Decimal::ONE + growth, &format!("revenue at {period}"))?;
        revenues.push(revenue);
        prev = revenue;
    }
    Ok(revenues)
}

fn build_terminal(revenue: Money, assumptions: &AssumptionSet) -> FcffResult<TerminalProjection> {
    let growth = *assumptions.revenue_growth.terminal();
    let operating_margin = *assumptions.operating_margin.terminal();
    let tax_rate = *assumptions.tax_rate.terminal();
    let ebit = checked_mul(revenue, operating_margin, "terminal EBIT")?;
    let ebit_after_tax = checked_mul(ebit, Decimal::ONE - tax_rate, "terminal EBIT after tax")?;

    if assumptions.roic_tv < Decimal::ZERO {
        return Err(FcffError::InvalidInput {
            field: "roic_tv".into(),
            reason: format!("Terminal ROIC must not be negative (got {})", assumptions.roic_tv),
        });
    }
    let reinvestment = checked_div(
        checked_mul(ebit_after_tax, growth, "terminal reinvestment (growth)")?,
        assumptions.roic_tv,
        "terminal reinvestment (roic_tv)",
    )?;

    Ok(TerminalProjection {
        revenue_growth: growth,
        revenue,
        operating_margin,
        ebit,
        tax_rate,
        ebit_after_tax,
        reinvestment,
        wacc: *assumptions.wacc.terminal(),
        roic_tv: assumptions.roic_tv,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
