use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FcffError;
use crate::period::{year_array, Horizon, FORECAST_YEARS};
use crate::types::{Multiple, Rate};
use crate::FcffResult;

/// One valuation scenario: a value per forecast year (and terminal period)
/// for every driver of the FCFF model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionSet {
    /// Growth applied to prior-period revenue; the terminal slot is the
    /// perpetual growth rate
    pub revenue_growth: Horizon<Rate>,
    /// EBIT / revenue
    pub operating_margin: Horizon<Rate>,
    pub tax_rate: Horizon<Rate>,
    /// Revenue-delta divisor backing out reinvestment (years 1..=10 only;
    /// terminal reinvestment comes from `roic_tv`)
    pub reinvestment_rate: [Multiple; FORECAST_YEARS],
    pub wacc: Horizon<Rate>,
    /// Terminal return on invested capital
    pub roic_tv: Rate,
}

impl AssumptionSet {
    /// Build from positional vectors, checking every length.
    pub fn from_vectors(
        revenue_growth: &[Rate],
        operating_margin: &[Rate],
        tax_rate: &[Rate],
        reinvestment_rate: &[Multiple],
        wacc: &[Rate],
        roic_tv: Rate,
    ) -> FcffResult<Self> {
        Ok(Self {
            revenue_growth: Horizon::from_slice("revenue_growth", revenue_growth)?,
            operating_margin: Horizon::from_slice("operating_margin", operating_margin)?,
            tax_rate: Horizon::from_slice("tax_rate", tax_rate)?,
            reinvestment_rate: year_array("reinvestment_rate", reinvestment_rate)?,
            wacc: Horizon::from_slice("wacc", wacc)?,
            roic_tv,
        })
    }

    /// Reject inputs that would divide by zero or break the Gordon growth
    /// condition.
    pub fn validate(&self) -> FcffResult<()> {
        for (idx, rate) in self.reinvestment_rate.iter().enumerate() {
            if *rate <= Decimal::ZERO {
                return Err(FcffError::InvalidInput {
                    field: format!("reinvestment_rate[Year {}]", idx + 1),
                    reason: format!("Reinvestment rate must be positive (got {rate})"),
                });
            }
        }
        if self.roic_tv <= Decimal::ZERO {
            return Err(FcffError::InvalidInput {
                field: "roic_tv".into(),
                reason: format!("Terminal ROIC must be positive (got {})", self.roic_tv),
            });
        }
        let wacc_tv = *self.wacc.terminal();
        let growth_tv = *self.revenue_growth.terminal();
        if wacc_tv <= growth_tv {
            return Err(FcffError::FinancialImpossibility(format!(
                "Terminal growth rate ({growth_tv}) must be less than terminal WACC ({wacc_tv}) for the Gordon growth model"
            )));
        }
        Ok(())
    }
}
