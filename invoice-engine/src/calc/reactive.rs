use rust_decimal::Decimal;
use serde::Serialize;

use super::ConsumptionTotals;
use crate::error::{BillingError, Result};
use crate::money;

/// Reactive energy penalty of a month.
///
/// Inductive and capacitive energy are each compared against the same
/// allowance, `active × tolerance_ratio`, and only the part above it is
/// charged. With no active energy the allowance is zero and all reactive
/// energy is excess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReactivePenalty {
    pub allowed_kvarh: Decimal,
    pub excess_inductive_kvarh: Decimal,
    pub excess_capacitive_kvarh: Decimal,
    pub charge: Decimal,
}

impl ReactivePenalty {
    pub fn calculate(totals: &ConsumptionTotals, tolerance_ratio: Decimal, unit_price: Decimal) -> Result<Self> {
        if tolerance_ratio.is_sign_negative() {
            return Err(BillingError::InvalidReading(format!(
                "reactive tolerance ratio is negative ({tolerance_ratio})"
            )));
        }

        let allowed_kvarh = money::mul(totals.active_kwh, tolerance_ratio, "reactive allowance")?;
        let excess_inductive_kvarh = money::floor_zero(money::sub(
            totals.inductive_kvarh,
            allowed_kvarh,
            "inductive excess",
        )?);
        let excess_capacitive_kvarh = money::floor_zero(money::sub(
            totals.capacitive_kvarh,
            allowed_kvarh,
            "capacitive excess",
        )?);

        let excess = money::add(excess_inductive_kvarh, excess_capacitive_kvarh, "reactive excess")?;
        let charge = money::mul(excess, unit_price, "reactive penalty charge")?;

        Ok(Self {
            allowed_kvarh,
            excess_inductive_kvarh,
            excess_capacitive_kvarh,
            charge,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn totals(active: Decimal, inductive: Decimal, capacitive: Decimal) -> ConsumptionTotals {
        ConsumptionTotals {
            active_kwh: active,
            inductive_kvarh: inductive,
            capacitive_kvarh: capacitive,
            hours: 720,
        }
    }

    #[test]
    fn inductive_excess_above_tolerance() {
        let penalty = ReactivePenalty::calculate(&totals(dec!(1000), dec!(300), dec!(0)), dec!(0.2), dec!(0.5)).unwrap();
        assert_eq!(penalty.allowed_kvarh, dec!(200));
        assert_eq!(penalty.excess_inductive_kvarh, dec!(100));
        assert_eq!(penalty.excess_capacitive_kvarh, Decimal::ZERO);
        assert_eq!(penalty.charge, dec!(50));
    }

    #[test]
    fn at_the_bound_there_is_no_penalty() {
        let penalty = ReactivePenalty::calculate(&totals(dec!(1000), dec!(200), dec!(200)), dec!(0.2), dec!(0.5)).unwrap();
        assert_eq!(penalty.charge, Decimal::ZERO);
    }

    #[test]
    fn one_unit_over_the_bound_is_penalised() {
        let penalty = ReactivePenalty::calculate(&totals(dec!(1000), dec!(201), dec!(0)), dec!(0.2), dec!(0.5)).unwrap();
        assert_eq!(penalty.excess_inductive_kvarh, dec!(1));
        assert!(penalty.charge > Decimal::ZERO);
    }

    #[test]
    fn directions_are_compared_separately() {
        // 150 + 150 exceeds 200 in sum, but neither direction does on its own.
        let penalty = ReactivePenalty::calculate(&totals(dec!(1000), dec!(150), dec!(150)), dec!(0.2), dec!(0.5)).unwrap();
        assert_eq!(penalty.charge, Decimal::ZERO);

        let both = ReactivePenalty::calculate(&totals(dec!(1000), dec!(260), dec!(230)), dec!(0.2), dec!(1)).unwrap();
        assert_eq!(both.excess_inductive_kvarh, dec!(60));
        assert_eq!(both.excess_capacitive_kvarh, dec!(30));
        assert_eq!(both.charge, dec!(90));
    }

    #[test]
    fn zero_active_energy_makes_all_reactive_energy_excess() {
        let penalty = ReactivePenalty::calculate(&totals(dec!(0), dec!(40), dec!(5)), dec!(0.2), dec!(2)).unwrap();
        assert_eq!(penalty.allowed_kvarh, Decimal::ZERO);
        assert_eq!(penalty.charge, dec!(90));
    }
}
