use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FcffError;
use crate::FcffResult;

/// Number of explicit forecast years before the terminal period.
pub const FORECAST_YEARS: usize = 10;

/// Assumption slots per horizon: the forecast years plus the terminal period.
pub const HORIZON_LEN: usize = FORECAST_YEARS + 1;

/// A labelled model period. `Year(n)` is 1-based: `Year(1)` is the first
/// forecast year after the base year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Base,
    Year(u8),
    Terminal,
}

impl Period {
    /// Year 1..=10 in order.
    pub fn forecast_years() -> impl Iterator<Item = Period> {
        (1..=FORECAST_YEARS as u8).map(Period::Year)
    }

    /// Base year, the forecast years and the terminal period (12 periods).
    pub fn all() -> impl Iterator<Item = Period> {
        std::iter::once(Period::Base)
            .chain(Self::forecast_years())
            .chain(std::iter::once(Period::Terminal))
    }

    pub fn label(&self) -> String {
        match self {
            Period::Base => "Base Year".to_string(),
            Period::Year(n) => format!("Year {n}"),
            Period::Terminal => "Terminal Value".to_string(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One value per forecast year (1..=10) plus one for the terminal period.
///
/// Serialises as a flat sequence of 11 values, terminal last, so external
/// callers keep the familiar "11 numbers per row" shape while the model code
/// addresses periods by year number instead of raw positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<T>", into = "Vec<T>")]
pub struct Horizon<T: Clone> {
    years: [T; FORECAST_YEARS],
    terminal: T,
}

impl<T: Clone> Horizon<T> {
    pub fn new(years: [T; FORECAST_YEARS], terminal: T) -> Self {
        Self { years, terminal }
    }

    /// Same value in every forecast year and the terminal period.
    pub fn uniform(value: T) -> Self {
        Self {
            years: std::array::from_fn(|_| value.clone()),
            terminal: value,
        }
    }

    /// Build from a positional slice of exactly 11 values (terminal last).
    pub fn from_slice(field: &str, values: &[T]) -> FcffResult<Self> {
        Self::try_from(values.to_vec()).map_err(|reason| FcffError::InvalidInput {
            field: field.to_string(),
            reason,
        })
    }

    /// Value for forecast year `year` (1-based).
    ///
    /// # Panics
    ///
    /// Panics if `year` is outside `1..=FORECAST_YEARS`.
    pub fn year(&self, year: usize) -> &T {
        assert!(
            (1..=FORECAST_YEARS).contains(&year),
            "forecast year {year} outside 1..={FORECAST_YEARS}"
        );
        &self.years[year - 1]
    }

    pub fn years(&self) -> &[T; FORECAST_YEARS] {
        &self.years
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    /// Lookup by period label; `None` for the base year.
    pub fn get(&self, period: Period) -> Option<&T> {
        match period {
            Period::Base => None,
            Period::Year(n) => self.years.get((n as usize).checked_sub(1)?),
            Period::Terminal => Some(&self.terminal),
        }
    }

    /// Iterate `(period, value)` over the forecast years then the terminal.
    pub fn iter(&self) -> impl Iterator<Item = (Period, &T)> {
        Period::forecast_years()
            .zip(self.years.iter())
            .chain(std::iter::once((Period::Terminal, &self.terminal)))
    }

    pub fn map<U: Clone>(&self, mut f: impl FnMut(&T) -> U) -> Horizon<U> {
        Horizon {
            years: std::array::from_fn(|i| f(&self.years[i])),
            terminal: f(&self.terminal),
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.clone().into()
    }
}

impl<T: Clone> TryFrom<Vec<T>> for Horizon<T> {
    type Error = String;

    fn try_from(mut values: Vec<T>) -> Result<Self, Self::Error> {
        if values.len() != HORIZON_LEN {
            return Err(format!(
                "expected {HORIZON_LEN} values ({FORECAST_YEARS} forecast years + terminal), got {}",
                values.len()
            ));
        }
        let terminal = values.pop().ok_or("missing terminal value")?;
        let years: [T; FORECAST_YEARS] = values
            .try_into()
            .map_err(|_| format!("expected {FORECAST_YEARS} forecast-year values"))?;
        Ok(Self { years, terminal })
    }
}

impl<T: Clone> From<Horizon<T>> for Vec<T> {
    fn from(h: Horizon<T>) -> Self {
        let mut out = Vec::with_capacity(HORIZON_LEN);
        out.extend(h.years);
        out.push(h.terminal);
        out
    }
}

/// Validate a positional slice of per-year values (no terminal slot).
pub fn year_array<T: Copy>(field: &str, values: &[T]) -> FcffResult<[T; FORECAST_YEARS]> {
    values.try_into().map_err(|_| FcffError::InvalidInput {
        field: field.to_string(),
        reason: format!(
            "expected {FORECAST_YEARS} values (forecast years only), got {}",
            values.len()
        ),
    })
}
