use billing_client::domain::MonthlyDemand;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{BillingError, Result};
use crate::money;

/// Effective peak demand of a month, after the meter multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DemandReading {
    pub peak_kw: Decimal,
    pub is_final: bool,
}

impl DemandReading {
    pub fn from_record(record: &MonthlyDemand) -> Result<Self> {
        let what = |field: &str| {
            format!(
                "{field} of {} for {:04}-{:02}",
                record.facility_id, record.period_year, record.period_month
            )
        };
        let raw = money::from_reading(record.peak_kw, &what("peak_kw"))?;
        let multiplier = money::from_reading(record.multiplier, &what("multiplier"))?;
        if multiplier.is_zero() {
            return Err(BillingError::InvalidReading(format!("{} is zero", what("multiplier"))));
        }

        Ok(Self {
            peak_kw: money::mul(raw, multiplier, &what("effective peak demand"))?,
            is_final: record.is_final,
        })
    }
}

/// Demand charges of a month, at full precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DemandCharges {
    pub contracted_kw: Decimal,
    pub peak_kw: Decimal,
    pub excess_kw: Decimal,
    pub base_charge: Decimal,
    pub excess_charge: Decimal,
    /// False only when the charges rest on a provisional demand record.
    pub is_final: bool,
}

impl DemandCharges {
    /// Charges of a facility without a contracted limit.
    pub fn none() -> Self {
        Self {
            is_final: true,
            ..Self::default()
        }
    }

    /// The base charge is always for the full contracted capacity; only the
    /// draw above it is charged at the excess price.
    pub fn calculate(
        reading: DemandReading,
        contracted_kw: Decimal,
        base_unit_price: Decimal,
        excess_unit_price: Decimal,
    ) -> Result<Self> {
        if contracted_kw.is_sign_negative() {
            return Err(BillingError::InvalidReading(format!(
                "contracted demand is negative ({contracted_kw})"
            )));
        }

        let excess_kw = money::floor_zero(money::sub(reading.peak_kw, contracted_kw, "demand excess")?);

        Ok(Self {
            contracted_kw,
            peak_kw: reading.peak_kw,
            excess_kw,
            base_charge: money::mul(contracted_kw, base_unit_price, "demand base charge")?,
            excess_charge: money::mul(excess_kw, excess_unit_price, "demand excess charge")?,
            is_final: reading.is_final,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn reading(peak: Decimal) -> DemandReading {
        DemandReading {
            peak_kw: peak,
            is_final: true,
        }
    }

    #[test]
    fn excess_above_contract_is_charged_on_top_of_base() {
        let charges = DemandCharges::calculate(reading(dec!(120)), dec!(100), dec!(10), dec!(25)).unwrap();
        assert_eq!(charges.excess_kw, dec!(20));
        assert_eq!(charges.base_charge, dec!(1000));
        assert_eq!(charges.excess_charge, dec!(500));
    }

    #[test]
    fn base_is_owed_even_without_any_draw() {
        let charges = DemandCharges::calculate(reading(dec!(0)), dec!(100), dec!(10), dec!(25)).unwrap();
        assert_eq!(charges.base_charge, dec!(1000));
        assert_eq!(charges.excess_kw, Decimal::ZERO);
        assert_eq!(charges.excess_charge, Decimal::ZERO);
    }

    #[test]
    fn peak_exactly_at_contract_has_no_excess() {
        let charges = DemandCharges::calculate(reading(dec!(100)), dec!(100), dec!(10), dec!(25)).unwrap();
        assert_eq!(charges.excess_charge, Decimal::ZERO);
    }

    #[test]
    fn multiplier_scales_the_raw_peak() {
        let record = MonthlyDemand {
            facility_id: "fac-1".into(),
            period_year: 2024,
            period_month: 5,
            peak_kw: 1.5,
            is_final: false,
            multiplier: 80.0,
        };
        let reading = DemandReading::from_record(&record).unwrap();
        assert_eq!(reading.peak_kw, dec!(120));
        assert!(!reading.is_final);
    }

    #[test]
    fn zero_multiplier_is_invalid() {
        let record = MonthlyDemand {
            facility_id: "fac-1".into(),
            period_year: 2024,
            period_month: 5,
            peak_kw: 10.0,
            is_final: true,
            multiplier: 0.0,
        };
        assert!(matches!(
            DemandReading::from_record(&record),
            Err(BillingError::InvalidReading(_))
        ));
    }

    #[test]
    fn provisional_reading_carries_through() {
        let provisional = DemandReading {
            peak_kw: dec!(50),
            is_final: false,
        };
        let charges = DemandCharges::calculate(provisional, dec!(100), dec!(10), dec!(25)).unwrap();
        assert!(!charges.is_final);
        assert!(DemandCharges::none().is_final);
    }
}
