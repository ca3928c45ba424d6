use chrono::NaiveDate;
use fcff_core::assumptions::AssumptionSet;
use fcff_core::fact_base::FactBase;
use fcff_core::period::{Horizon, Period, FORECAST_YEARS};
use fcff_core::time_value::cumulative_discount_factors;
use fcff_core::types::Currency;
use fcff_core::valuation::{forecast, track_roic, valuate, value_assumptions, value_company, ValuationInput};
use fcff_core::FcffError;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

/// FY2024 large-cap software fact base (figures in millions).
fn large_cap_fact_base() -> FactBase {
    FactBase {
        company: "MSFT".into(),
        fiscal_year: Some("FY 2024".into()),
        currency: Currency::USD,
        base_revenue: dec!(245122),
        base_ebit: dec!(109433),
        base_tax_rate: dec!(0.182),
        cash: dec!(75543),
        // 8942 short term + 42688 long term
        total_debt: dec!(51630),
        shares_outstanding: dec!(7469),
        invested_capital: dec!(317716),
        anchor_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        market_reference_date: NaiveDate::from_ymd_opt(2024, 7, 30).unwrap(),
        market_price: dec!(422.92),
    }
}

fn large_cap_assumptions() -> AssumptionSet {
    AssumptionSet::from_vectors(
        &[
            dec!(0.10), dec!(0.10), dec!(0.10), dec!(0.10), dec!(0.10),
            dec!(0.0986), dec!(0.0972), dec!(0.0858), dec!(0.0644), dec!(0.043), dec!(0.043),
        ],
        &[dec!(0.45); 11],
        &[dec!(0.142); 11],
        &[dec!(2); 10],
        &[
            dec!(0.098), dec!(0.098), dec!(0.098), dec!(0.098), dec!(0.098),
            dec!(0.0952), dec!(0.0924), dec!(0.0896), dec!(0.0868), dec!(0.084), dec!(0.084),
        ],
        dec!(0.2),
    )
    .unwrap()
}

// ===========================================================================
// End-to-end regression
// ===========================================================================

#[test]
fn test_large_cap_fair_value_regression() {
    let v = value_assumptions(&large_cap_fact_base(), &large_cap_assumptions()).unwrap();

    // Sum of discounted FCFF ~ 845,536.56
    assert!((v.sum_discounted_fcff - dec!(845536.5633)).abs() < dec!(0.001));
    // TV ~ 4,422,624.14, discounted at DF10 ~ 0.408007
    assert!((v.terminal_value - dec!(4422624.1448)).abs() < dec!(0.001));
    assert!((v.discounted_terminal_value - dec!(1804459.7487)).abs() < dec!(0.001));
    // Equity = 2,649,996.31 - 51,630 + 75,543
    assert!((v.equity_value - dec!(2673909.3120)).abs() < dec!(0.001));
    assert!(
        (v.fair_value_per_share - dec!(358.0010)).abs() < dec!(0.0001),
        "fair value drifted: {}",
        v.fair_value_per_share
    );
    assert_eq!(v.market.price, dec!(422.92));
    assert_eq!(v.market.date, NaiveDate::from_ymd_opt(2024, 7, 30).unwrap());
    assert!(v.upside_to_market.unwrap() < Decimal::ZERO);
}

#[test]
fn test_large_cap_year1_line_items() {
    let series = forecast(&large_cap_fact_base(), &large_cap_assumptions()).unwrap();
    let y1 = series.year(1);
    // 245122 * 1.10
    assert_eq!(y1.revenue, dec!(269634.2));
    // 269634.2 * 0.45 * 0.858
    assert_eq!(y1.ebit_after_tax, dec!(104105.76462));
    // (296597.62 - 269634.2) / 2
    assert_eq!(y1.reinvestment, dec!(13481.71));
    assert_eq!(y1.date, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
    assert!((series.final_discount_factor().unwrap() - dec!(0.40800658)).abs() < dec!(0.00000001));
}

#[test]
fn test_large_cap_roic_window() {
    let fb = large_cap_fact_base();
    let series = forecast(&fb, &large_cap_assumptions()).unwrap();
    let roic = track_roic(&fb, &series).unwrap();
    // IC1 = 317716 + 13481.71
    assert_eq!(roic.years[0].invested_capital, Some(dec!(331197.71)));
    assert!((roic.years[0].roic.unwrap() - dec!(0.320862)).abs() < dec!(0.000001));
    assert!((roic.years[8].roic.unwrap() - dec!(0.457832)).abs() < dec!(0.000001));
    assert!(roic.years[9].roic.is_none());
    assert_eq!(roic.terminal_roic, dec!(0.2));
}

#[test]
fn test_value_company_matches_direct_path() {
    let input = ValuationInput {
        fact_base: large_cap_fact_base(),
        assumptions: large_cap_assumptions(),
    };
    let out = value_company(&input).unwrap();
    let direct = value_assumptions(&input.fact_base, &input.assumptions).unwrap();
    assert_eq!(out.result.valuation, direct);
    // TV share ~ 68% of firm value: below the warning threshold
    assert!(!out.warnings.iter().any(|w| w.contains("Terminal value represents")));
}

#[test]
fn test_forecast_and_valuation_idempotent() {
    let fb = large_cap_fact_base();
    let assumptions = large_cap_assumptions();
    let first = forecast(&fb, &assumptions).unwrap();
    let second = forecast(&fb, &assumptions).unwrap();
    assert_eq!(first, second);
    assert_eq!(valuate(&fb, &first).unwrap(), valuate(&fb, &second).unwrap());
}

#[test]
fn test_rows_are_labelled() {
    let rows = forecast(&large_cap_fact_base(), &large_cap_assumptions())
        .unwrap()
        .rows();
    let labels: Vec<String> = rows.iter().map(|r| r.label.clone()).collect();
    assert_eq!(labels.first().map(String::as_str), Some("Base Year"));
    assert_eq!(labels[10], "Year 10");
    assert_eq!(labels.last().map(String::as_str), Some("Terminal Value"));
    assert_eq!(rows[11].period, Period::Terminal);
}

// ===========================================================================
// Configuration errors
// ===========================================================================

#[test]
fn test_gordon_violation_is_configuration_error() {
    let mut assumptions = large_cap_assumptions();
    assumptions.wacc = Horizon::new([dec!(0.098); FORECAST_YEARS], dec!(0.043));
    let err = value_assumptions(&large_cap_fact_base(), &assumptions).unwrap_err();
    assert!(matches!(err, FcffError::FinancialImpossibility(_)));
}

#[test]
fn test_wrong_length_is_configuration_error() {
    let err = AssumptionSet::from_vectors(
        &[dec!(0.1); 10],
        &[dec!(0.45); 11],
        &[dec!(0.142); 11],
        &[dec!(2); 10],
        &[dec!(0.09); 11],
        dec!(0.2),
    )
    .unwrap_err();
    assert!(matches!(err, FcffError::InvalidInput { ref field, .. } if field == "revenue_growth"));
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_discount_factors_non_increasing(bps in prop::collection::vec(1u32..3000, 10)) {
        let rates: Vec<Decimal> = bps.iter().map(|b| Decimal::new(*b as i64, 4)).collect();
        let factors = cumulative_discount_factors(&rates).unwrap();
        prop_assert!(factors[0] < Decimal::ONE);
        for pair in factors.windows(2) {
            prop_assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn prop_fair_value_decreasing_in_debt(extra in 1u32..1_000_000) {
        let base = value_assumptions(&large_cap_fact_base(), &large_cap_assumptions()).unwrap();
        let mut fb = large_cap_fact_base();
        fb.total_debt += Decimal::from(extra);
        let levered = value_assumptions(&fb, &large_cap_assumptions()).unwrap();
        prop_assert!(levered.fair_value_per_share < base.fair_value_per_share);
    }

    #[test]
    fn prop_fair_value_increasing_in_cash(extra in 1u32..1_000_000) {
        let base = value_assumptions(&large_cap_fact_base(), &large_cap_assumptions()).unwrap();
        let mut fb = large_cap_fact_base();
        fb.cash += Decimal::from(extra);
        let richer = value_assumptions(&fb, &large_cap_assumptions()).unwrap();
        prop_assert!(richer.fair_value_per_share > base.fair_value_per_share);
    }

    #[test]
    fn prop_zero_growth_keeps_revenue_flat(margin_bps in 1u32..9000) {
        let mut assumptions = large_cap_assumptions();
        assumptions.revenue_growth = Horizon::uniform(Decimal::ZERO);
        assumptions.operating_margin = Horizon::uniform(Decimal::new(margin_bps as i64, 4));
        let series = forecast(&large_cap_fact_base(), &assumptions).unwrap();
        for y in &series.years {
            prop_assert_eq!(y.revenue, dec!(245122));
        }
        prop_assert_eq!(series.terminal.revenue, dec!(245122));
    }
}
