//! Checked decimal arithmetic shared by the calculators.
//!
//! Every helper reports overflow as `InvalidReading` at the first place it
//! happens, naming what was being computed.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{BillingError, Result};

/// Convert a metered `f64` into a decimal, rejecting NaN, infinities and
/// negative values.
pub fn from_reading(value: f64, what: &str) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(BillingError::InvalidReading(format!("{what} is not finite ({value})")));
    }
    if value < 0.0 {
        return Err(BillingError::InvalidReading(format!("{what} is negative ({value})")));
    }
    Decimal::try_from(value)
        .map_err(|e| BillingError::InvalidReading(format!("{what} is not representable ({value}): {e}")))
}

pub fn add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(what))
}

pub fn sub(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_sub(b).ok_or_else(|| overflow(what))
}

pub fn mul(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(what))
}

pub fn div(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_div(b).ok_or_else(|| overflow(what))
}

/// Sum in order; the order is part of the contract for reproducible results.
pub fn sum<I>(values: I, what: &str) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| add(acc, v, what))
}

/// `max(0, value)`.
pub fn floor_zero(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Round half-up to the currency's minor unit.
pub fn round_minor(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

fn overflow(what: &str) -> BillingError {
    BillingError::InvalidReading(format!("arithmetic overflow computing {what}"))
}
