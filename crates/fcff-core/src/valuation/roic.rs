use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::fact_base::FactBase;
use crate::period::{Period, FORECAST_YEARS};
use crate::time_value::{checked_add, checked_div};
use crate::types::{Money, Rate};
use crate::FcffResult;

use super::forecast::ForecastSeries;

/// Years for which invested capital is rolled forward. Year 10 is left
/// empty: its reinvestment funds the terminal step, not a forecast year.
pub const ROLL_FORWARD_YEARS: usize = FORECAST_YEARS - 1;

/// Invested capital and return for one forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoicYear {
    pub period: Period,
    pub invested_capital: Option<Money>,
    pub avg_invested_capital: Option<Money>,
    pub roic: Option<Rate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoicSeries {
    pub base_invested_capital: Money,
    pub years: Vec<RoicYear>,
    /// Pass-through of the assumed terminal ROIC
    pub terminal_roic: Rate,
}

/// Flattened, labelled row for tabular display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoicRow {
    pub period: Period,
    pub label: String,
    pub invested_capital: Option<Money>,
    pub avg_invested_capital: Option<Money>,
    pub roic: Option<Rate>,
}

impl RoicSeries {
    pub fn rows(&self) -> Vec<RoicRow> {
        let mut rows = Vec::with_capacity(FORECAST_YEARS + 2);
        rows.push(RoicRow {
            period: Period::Base,
            label: Period::Base.label(),
            invested_capital: Some(self.base_invested_capital),
            avg_invested_capital: None,
            roic: None,
        });
        rows.extend(self.years.iter().map(|y| RoicRow {
            period: y.period,
            label: y.period.label(),
            invested_capital: y.invested_capital,
            avg_invested_capital: y.avg_invested_capital,
            roic: y.roic,
        }));
        rows.push(RoicRow {
            period: Period::Terminal,
            label: Period::Terminal.label(),
            invested_capital: None,
            avg_invested_capital: None,
            roic: Some(self.terminal_roic),
        });
        rows
    }
}

/// Roll invested capital forward with each year's reinvestment and compute
/// ROIC on the average of opening and closing capital.
pub fn track_roic(fact_base: &FactBase, forecast: &ForecastSeries) -> FcffResult<RoicSeries> {
    forecast.validate()?;
    let mut years = Vec::with_capacity(FORECAST_YEARS);
    let mut opening = fact_base.invested_capital;

    for (idx, projection) in forecast.years.iter().enumerate() {
        let year = idx + 1;
        if year > ROLL_FORWARD_YEARS {
            years.push(RoicYear {
                period: projection.period,
                invested_capital: None,
                avg_invested_capital: None,
                roic: None,
            });
            continue;
        }

        let closing = checked_add(
            opening,
            projection.reinvestment,
            &format!("invested capital at Year {year}"),
        )?;
        let average = checked_add(opening, closing, &format!("average invested capital at Year {year}"))?
            / dec!(2);
        let roic = checked_div(
            projection.ebit_after_tax,
            average,
            &format!("ROIC at Year {year} (average invested capital)"),
        )?;

        years.push(RoicYear {
            period: projection.period,
            invested_capital: Some(closing),
            avg_invested_capital: Some(average),
            roic: Some(roic),
        });
        opening = closing;
    }

    if years.iter().any(|y| y.roic.is_some_and(|r| r < Decimal::ZERO)) {
        tracing::warn!(company = %fact_base.company, "negative ROIC in forecast window");
    }

    Ok(RoicSeries {
        base_invested_capital: fact_base.invested_capital,
        years,
        terminal_roic: forecast.terminal.roic_tv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::AssumptionSet;
    use crate::error::FcffError;
    use crate::period::Horizon;
    use crate::types::Currency;
    use crate::valuation::forecast::forecast;
    use chrono::NaiveDate;

    fn sample_fact_base() -> FactBase {
        FactBase {
            company: "TEST".into(),
            fiscal_year: None,
            currency: Currency::USD,
            base_revenue: dec!(1000),
            base_ebit: dec!(200),
            base_tax_rate: dec!(0.21),
            cash: dec!(100),
            total_debt: dec!(300),
            shares_outstanding: dec!(50),
            invested_capital: dec!(800),
            anchor_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            market_reference_date: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            market_price: dec!(40),
        }
    }

    fn sample_assumptions() -> AssumptionSet {
        AssumptionSet {
            revenue_growth: Horizon::uniform(dec!(0.10)),
            operating_margin: Horizon::uniform(dec!(0.20)),
            tax_rate: Horizon::uniform(dec!(0.25)),
            reinvestment_rate: [dec!(2); FORECAST_YEARS],
            wacc: Horizon::uniform(dec!(0.10)),
            roic_tv: dec!(0.18),
        }
    }

    #[test]
    fn test_roll_forward_year1() {
        let fb = sample_fact_base();
        let fc = forecast(&fb, &sample_assumptions()).unwrap();
        let roic = track_roic(&fb, &fc).unwrap();
        let y1 = &roic.years[0];
        // IC1 = 800 + 55 = 855; avg = 827.5; ROIC = 165 / 827.5
        assert_eq!(y1.invested_capital, Some(dec!(855)));
        assert_eq!(y1.avg_invested_capital, Some(dec!(827.5)));
        assert_eq!(y1.roic, Some(dec!(165) / dec!(827.5)));
    }

    #[test]
    fn test_cumulative_capital() {
        let fb = sample_fact_base();
        let fc = forecast(&fb, &sample_assumptions()).unwrap();
        let roic = track_roic(&fb, &fc).unwrap();
        let cumulative: Money = fc.years[..ROLL_FORWARD_YEARS]
            .iter()
            .map(|y| y.reinvestment)
            .sum();
        assert_eq!(
            roic.years[ROLL_FORWARD_YEARS - 1].invested_capital,
            Some(dec!(800) + cumulative)
        );
    }

    #[test]
    fn test_year10_absent_terminal_passthrough() {
        let fb = sample_fact_base();
        let fc = forecast(&fb, &sample_assumptions()).unwrap();
        let roic = track_roic(&fb, &fc).unwrap();
        assert_eq!(roic.years.len(), FORECAST_YEARS);
        let y10 = &roic.years[FORECAST_YEARS - 1];
        assert_eq!(y10.period, Period::Year(10));
        assert!(y10.invested_capital.is_none());
        assert!(y10.roic.is_none());
        assert_eq!(roic.terminal_roic, dec!(0.18));

        let rows = roic.rows();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].invested_capital, Some(dec!(800)));
        assert_eq!(rows[11].roic, Some(dec!(0.18)));
        assert!(rows[11].invested_capital.is_none());
    }

    #[test]
    fn test_zero_average_capital_is_error() {
        let mut fb = sample_fact_base();
        fb.invested_capital = Decimal::ZERO;
        let mut assumptions = sample_assumptions();
        assumptions.revenue_growth = Horizon::uniform(Decimal::ZERO);
        let fc = forecast(&fb, &assumptions).unwrap();
        let err = track_roic(&fb, &fc).unwrap_err();
        assert!(matches!(err, FcffError::DivisionByZero { ref context } if context.contains("Year 1")));
    }

    #[test]
    fn test_malformed_forecast_rejected() {
        let fb = sample_fact_base();
        let mut fc = forecast(&fb, &sample_assumptions()).unwrap();
        fc.years.pop();
        let err = track_roic(&fb, &fc).unwrap_err();
        assert!(matches!(err, FcffError::InvalidInput { ref field, .. } if field == "forecast.years"));
    }
}
