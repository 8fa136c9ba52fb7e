use std::collections::BTreeMap;

use billing_client::domain::EnergyPricing;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use time::OffsetDateTime;

use super::ConsumptionTotals;
use crate::error::{BillingError, Result};
use crate::money;
use crate::transform::{HourlyReading, PricePoint};

const KWH_PER_MWH: Decimal = dec!(1000);
const UNIT_PRICE_SCALE: u32 = 6;

/// Energy component of the invoice, at full precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnergyCharge {
    pub charge: Decimal,
    /// Unit price shown on the invoice. For market-indexed pricing this is the
    /// consumption-weighted average, rounded to six places.
    pub effective_unit_price: Decimal,
}

/// Price the month's active energy.
///
/// `regulated`: `total kWh × unit price`.
/// `market_indexed`: `Σ kWh_h × price_h / 1000 + total kWh × unit price`, where
/// the unit price is the supplier adder. Every hour with consumption needs a
/// market price.
pub fn energy_charge(
    pricing: EnergyPricing,
    totals: &ConsumptionTotals,
    readings: &[HourlyReading],
    prices: &[PricePoint],
    unit_price: Decimal,
) -> Result<EnergyCharge> {
    let adder = money::mul(totals.active_kwh, unit_price, "energy charge")?;

    match pricing {
        EnergyPricing::Regulated => Ok(EnergyCharge {
            charge: adder,
            effective_unit_price: unit_price,
        }),
        EnergyPricing::MarketIndexed => {
            let market = market_cost(readings, prices)?;
            let charge = money::add(market, adder, "market-indexed energy charge")?;
            let effective_unit_price = if totals.active_kwh.is_zero() {
                unit_price
            } else {
                money::div(charge, totals.active_kwh, "effective energy unit price")?
                    .round_dp(UNIT_PRICE_SCALE)
            };
            Ok(EnergyCharge {
                charge,
                effective_unit_price,
            })
        }
    }
}

fn market_cost(readings: &[HourlyReading], prices: &[PricePoint]) -> Result<Decimal> {
    let mut by_hour: BTreeMap<OffsetDateTime, Decimal> = BTreeMap::new();
    for p in prices {
        if by_hour.insert(p.ts, p.price_per_mwh).is_some() {
            return Err(BillingError::InvalidReading(format!(
                "duplicate market price for {}",
                p.ts
            )));
        }
    }

    let mut cost = Decimal::ZERO;
    for r in readings.iter().filter(|r| !r.active_kwh.is_zero()) {
        let price = by_hour.get(&r.ts).ok_or_else(|| {
            BillingError::DataUnavailable(format!("no market price for consumed hour {}", r.ts))
        })?;
        let hour_cost = money::div(
            money::mul(r.active_kwh, *price, "hourly market cost")?,
            KWH_PER_MWH,
            "hourly market cost",
        )?;
        cost = money::add(cost, hour_cost, "market energy cost")?;
    }
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::calc::aggregate;

    fn reading(ts: OffsetDateTime, kwh: Decimal) -> HourlyReading {
        HourlyReading {
            ts,
            active_kwh: kwh,
            inductive_kvarh: Decimal::ZERO,
            capacitive_kvarh: Decimal::ZERO,
        }
    }

    fn price(ts: OffsetDateTime, per_mwh: Decimal) -> PricePoint {
        PricePoint {
            ts,
            price_per_mwh: per_mwh,
        }
    }

    #[test]
    fn regulated_energy_is_flat_priced() {
        let readings = [reading(datetime!(2024-01-01 00:00 +3), dec!(500))];
        let totals = aggregate(&readings).unwrap();
        let charge = energy_charge(EnergyPricing::Regulated, &totals, &readings, &[], dec!(2.5)).unwrap();
        assert_eq!(charge.charge, dec!(1250));
        assert_eq!(charge.effective_unit_price, dec!(2.5));
    }

    #[test]
    fn market_indexed_energy_uses_hourly_prices_plus_adder() {
        let h0 = datetime!(2024-01-01 00:00 +3);
        let h1 = datetime!(2024-01-01 01:00 +3);
        let readings = [reading(h0, dec!(100)), reading(h1, dec!(300))];
        let prices = [price(h0, dec!(2000)), price(h1, dec!(3000))];
        let totals = aggregate(&readings).unwrap();

        let charge = energy_charge(EnergyPricing::MarketIndexed, &totals, &readings, &prices, dec!(0.1)).unwrap();

        // 100 × 2 + 300 × 3 + 400 × 0.1
        assert_eq!(charge.charge, dec!(1140));
        assert_eq!(charge.effective_unit_price, dec!(2.85));
    }

    #[test]
    fn consumed_hour_without_price_is_unavailable() {
        let h0 = datetime!(2024-01-01 00:00 +3);
        let readings = [reading(h0, dec!(10))];
        let totals = aggregate(&readings).unwrap();
        let res = energy_charge(EnergyPricing::MarketIndexed, &totals, &readings, &[], dec!(0));
        assert!(matches!(res, Err(BillingError::DataUnavailable(_))));
    }

    #[test]
    fn idle_hours_do_not_need_a_price() {
        let h0 = datetime!(2024-01-01 00:00 +3);
        let readings = [reading(h0, dec!(0))];
        let totals = aggregate(&readings).unwrap();
        let charge = energy_charge(EnergyPricing::MarketIndexed, &totals, &readings, &[], dec!(0.2)).unwrap();
        assert_eq!(charge.charge, Decimal::ZERO);
        assert_eq!(charge.effective_unit_price, dec!(0.2));
    }
}
