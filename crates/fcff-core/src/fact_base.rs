use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::FcffError;
use crate::period::FORECAST_YEARS;
use crate::time_value::checked_div;
use crate::types::{Currency, MarketQuote, Money, Rate};
use crate::FcffResult;

// ---------------------------------------------------------------------------
// Source line items
// ---------------------------------------------------------------------------

pub const FIELD_REVENUE: &str = "Revenue";
pub const FIELD_EBIT: &str = "EBIT";
pub const FIELD_CASH: &str = "Cash, Cash Equivalents & STI";
pub const FIELD_SHORT_TERM_DEBT: &str = "Short Term Debt";
pub const FIELD_LONG_TERM_DEBT: &str = "Long Term Debt";
pub const FIELD_DILUTED_SHARES: &str = "Diluted Weighted Average Shares";
pub const FIELD_INVESTED_CAPITAL: &str = "Total Invested Capital";
/// Reported in percent (e.g. `14.2`), stored on the fact base as a fraction.
pub const FIELD_EFFECTIVE_TAX_RATE: &str = "Effective Tax Rate";
pub const FIELD_ANNOUNCEMENT_DATE: &str = "Latest Announcement Date";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Point-in-time financial facts for one company at one fiscal-year anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactBase {
    /// Company identifier (ticker or name)
    pub company: String,
    /// Fiscal-year label of the base year (e.g. "FY 2024")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<String>,
    #[serde(default)]
    pub currency: Currency,
    /// Base-year revenue; must be positive
    pub base_revenue: Money,
    /// Base-year operating income
    pub base_ebit: Money,
    /// Base-year effective tax rate as a fraction
    pub base_tax_rate: Rate,
    pub cash: Money,
    pub total_debt: Money,
    pub shares_outstanding: Decimal,
    pub invested_capital: Money,
    /// Fiscal year-end of the base year
    pub anchor_date: NaiveDate,
    /// Trading date the comparison price was taken on
    pub market_reference_date: NaiveDate,
    pub market_price: Money,
}

/// One long-form fundamental cell: a line item for a fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRecord {
    pub field: String,
    pub fiscal_year: String,
    pub reporting_date: NaiveDate,
    /// Raw cell text: a number, or a date for date-valued items
    pub value: String,
}

/// A daily closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Money,
}

// ---------------------------------------------------------------------------
// FactBase
// ---------------------------------------------------------------------------

impl FactBase {
    /// Check the invariants every valuation relies on.
    pub fn validate(&self) -> FcffResult<()> {
        if self.base_revenue <= Decimal::ZERO {
            return Err(FcffError::InvalidInput {
                field: "base_revenue".into(),
                reason: "Base revenue must be positive".into(),
            });
        }
        if self.shares_outstanding <= Decimal::ZERO {
            return Err(FcffError::InvalidInput {
                field: "shares_outstanding".into(),
                reason: "Shares outstanding must be positive".into(),
            });
        }
        let non_negative = [
            ("cash", self.cash),
            ("total_debt", self.total_debt),
            ("invested_capital", self.invested_capital),
            ("market_price", self.market_price),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(FcffError::InvalidInput {
                    field: field.into(),
                    reason: "Must be non-negative".into(),
                });
            }
        }
        Ok(())
    }

    /// Base-year EBIT margin.
    pub fn base_operating_margin(&self) -> FcffResult<Rate> {
        checked_div(self.base_ebit, self.base_revenue, "base operating margin")
    }

    pub fn market_quote(&self) -> MarketQuote {
        MarketQuote {
            date: self.market_reference_date,
            price: self.market_price,
        }
    }

    /// Anchor-aligned period-end dates for the base year and years 1..=10.
    ///
    /// A Feb 29 anchor falls back to Feb 28 in non-leap years.
    pub fn period_dates(&self) -> FcffResult<Vec<NaiveDate>> {
        let anchor = self.anchor_date;
        (0..=FORECAST_YEARS as i32)
            .map(|offset| {
                let year = anchor.year() + offset;
                NaiveDate::from_ymd_opt(year, anchor.month(), anchor.day())
                    .or_else(|| NaiveDate::from_ymd_opt(year, anchor.month(), anchor.day() - 1))
                    .ok_or_else(|| {
                        FcffError::DateError(format!(
                            "cannot roll anchor {anchor} forward to {year}"
                        ))
                    })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Build a fact base from long-form fundamentals and a price history.
///
/// Total debt is short- plus long-term debt; the tax rate is converted from
/// percent. The market price is the close on the latest announcement date,
/// or on the closest trading date to it (ties go to the earlier date).
pub fn extract_fact_base(
    company: &str,
    fiscal_year: &str,
    records: &[FundamentalRecord],
    prices: &[PricePoint],
) -> FcffResult<FactBase> {
    let year_records: Vec<&FundamentalRecord> = records
        .iter()
        .filter(|r| r.fiscal_year == fiscal_year)
        .collect();
    let anchor_date = year_records
        .first()
        .map(|r| r.reporting_date)
        .ok_or_else(|| {
            FcffError::InsufficientData(format!("No fundamentals for fiscal year '{fiscal_year}'"))
        })?;

    let number = |field: &str| -> FcffResult<Decimal> {
        let raw = lookup(&year_records, field)?;
        parse_decimal(raw).ok_or_else(|| FcffError::InvalidInput {
            field: field.into(),
            reason: format!("'{raw}' is not a number"),
        })
    };

    let announcement_raw = lookup(&year_records, FIELD_ANNOUNCEMENT_DATE)?;
    let announcement = parse_date(announcement_raw).ok_or_else(|| FcffError::InvalidInput {
        field: FIELD_ANNOUNCEMENT_DATE.into(),
        reason: format!("'{announcement_raw}' is not a date"),
    })?;
    let quote = closest_quote(prices, announcement)?;

    let fact_base = FactBase {
        company: company.to_string(),
        fiscal_year: Some(fiscal_year.to_string()),
        currency: Currency::default(),
        base_revenue: number(FIELD_REVENUE)?,
        base_ebit: number(FIELD_EBIT)?,
        base_tax_rate: number(FIELD_EFFECTIVE_TAX_RATE)? / dec!(100),
        cash: number(FIELD_CASH)?,
        total_debt: number(FIELD_SHORT_TERM_DEBT)? + number(FIELD_LONG_TERM_DEBT)?,
        shares_outstanding: number(FIELD_DILUTED_SHARES)?,
        invested_capital: number(FIELD_INVESTED_CAPITAL)?,
        anchor_date,
        market_reference_date: quote.date,
        market_price: quote.price,
    };
    fact_base.validate()?;

    tracing::debug!(
        company,
        fiscal_year,
        anchor = %fact_base.anchor_date,
        price_date = %fact_base.market_reference_date,
        "extracted fact base"
    );
    Ok(fact_base)
}

fn lookup<'a>(records: &[&'a FundamentalRecord], field: &str) -> FcffResult<&'a str> {
    records
        .iter()
        .find(|r| r.field.trim() == field)
        .map(|r| r.value.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FcffError::InvalidInput {
            field: field.into(),
            reason: "Required fact base field is missing".into(),
        })
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned = raw.replace(',', "");
    Decimal::from_str(&cleaned)
        .ok()
        .or_else(|| Decimal::from_scientific(&cleaned).ok())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Spreadsheet exports sometimes carry a midnight timestamp.
    let date_part = raw.split_whitespace().next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

fn closest_quote(prices: &[PricePoint], target: NaiveDate) -> FcffResult<MarketQuote> {
    prices
        .iter()
        .min_by_key(|p| ((p.date - target).num_days().abs(), p.date))
        .map(|p| MarketQuote {
            date: p.date,
            price: p.close,
        })
        .ok_or_else(|| FcffError::InsufficientData("Price history is empty".into()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
