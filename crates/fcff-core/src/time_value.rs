use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::FcffError;
use crate::types::Rate;
use crate::FcffResult;

/// Division that reports a zero divisor instead of panicking.
pub fn checked_div(numerator: Decimal, denominator: Decimal, context: &str) -> FcffResult<Decimal> {
    if denominator.is_zero() {
        return Err(FcffError::DivisionByZero {
            context: context.to_string(),
        });
    }
    numerator
        .checked_div(denominator)
        .ok_or_else(|| FcffError::NonFinite {
            context: context.to_string(),
        })
}

/// Multiplication that reports overflow instead of panicking.
pub fn checked_mul(a: Decimal, b: Decimal, context: &str) -> FcffResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| FcffError::NonFinite {
        context: context.to_string(),
    })
}

/// Addition that reports overflow instead of panicking.
pub fn checked_add(a: Decimal, b: Decimal, context: &str) -> FcffResult<Decimal> {
    a.checked_add(b).ok_or_else(|| FcffError::NonFinite {
        context: context.to_string(),
    })
}

/// Subtraction that reports overflow instead of panicking.
pub fn checked_sub(a: Decimal, b: Decimal, context: &str) -> FcffResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| FcffError::NonFinite {
        context: context.to_string(),
    })
}

/// Cumulative end-of-period discount factors.
///
/// `factors[i] = 1 / prod_{k<=i} (1 + rates[k])`, compounding from the first
/// period; a rate of -100% is rejected since it would zero the denominator.
pub fn cumulative_discount_factors(rates: &[Rate]) -> FcffResult<Vec<Rate>> {
    let mut factors = Vec::with_capacity(rates.len());
    let mut discount = Decimal::ONE;

    for (t, rate) in rates.iter().enumerate() {
        let one_plus_r = Decimal::ONE + rate;
        if one_plus_r <= Decimal::ZERO {
            return Err(FcffError::InvalidInput {
                field: format!("wacc[Year {}]", t + 1),
                reason: "Discount rate must be greater than -100%".into(),
            });
        }
        discount = checked_div(discount, one_plus_r, &format!("discount factor at Year {}", t + 1))?;
        factors.push(discount);
    }

    Ok(factors)
}

/// Convert a sampled f64 into a Decimal, rejecting NaN/Infinity.
pub fn decimal_from_f64(value: f64, context: &str) -> FcffResult<Decimal> {
    if !value.is_finite() {
        return Err(FcffError::NonFinite {
            context: context.to_string(),
        });
    }
    Decimal::from_f64(value).ok_or_else(|| FcffError::NonFinite {
        context: context.to_string(),
    })
}

/// Convert a Decimal result into f64 for statistics.
pub fn f64_from_decimal(value: Decimal, context: &str) -> FcffResult<f64> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FcffError::NonFinite {
            context: context.to_string(),
        })
}
