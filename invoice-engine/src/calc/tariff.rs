use billing_client::domain::{FacilitySettings, TariffRate};
use rust_decimal::Decimal;

use crate::error::{BillingError, Result};
use crate::period::BillingPeriod;

/// Select the single rate set that matches the facility's contract class and
/// whose validity window covers the whole period.
///
/// Zero matches and several matches are both configuration defects; neither
/// is resolved by picking one.
pub fn resolve_tariff(
    facility: &FacilitySettings,
    period: BillingPeriod,
    candidates: &[TariffRate],
) -> Result<TariffRate> {
    let first_day = period.first_day();
    let last_day = period.last_day();

    let mut matches = candidates
        .iter()
        .filter(|t| t.contract_class == facility.contract_class && t.covers(first_day, last_day));

    let selected = match (matches.next(), matches.next()) {
        (Some(only), None) => only,
        (None, _) => {
            return Err(BillingError::NoApplicableTariff(format!(
                "no rate set for {} covering {period} (facility {})",
                facility.contract_class, facility.facility_id
            )))
        }
        (Some(first), Some(second)) => {
            let mut ids = vec![first.tariff_id, second.tariff_id];
            ids.extend(matches.map(|t| t.tariff_id));
            return Err(BillingError::NoApplicableTariff(format!(
                "ambiguous rate sets {ids:?} for {} covering {period} (facility {})",
                facility.contract_class, facility.facility_id
            )));
        }
    };

    check_rates(selected)?;
    Ok(selected.clone())
}

fn check_rates(tariff: &TariffRate) -> Result<()> {
    let rates: [(&str, Decimal); 7] = [
        ("energy_unit_price", tariff.energy_unit_price),
        ("distribution_unit_price", tariff.distribution_unit_price),
        ("demand_base_unit_price", tariff.demand_base_unit_price),
        ("demand_excess_unit_price", tariff.demand_excess_unit_price),
        ("reactive_unit_price", tariff.reactive_unit_price),
        ("btv_rate", tariff.btv_rate),
        ("vat_rate", tariff.vat_rate),
    ];
    if let Some((name, value)) = rates.iter().find(|(_, v)| v.is_sign_negative() && !v.is_zero()) {
        return Err(BillingError::InvalidReading(format!(
            "tariff {} has negative {name} ({value})",
            tariff.tariff_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use billing_client::domain::{ContractClass, EnergyPricing, Sector, TimeOfUseTier, VoltageLevel};
    use rust_decimal_macros::dec;
    use time::macros::date;
    use time::Date;

    use super::*;

    const CLASS: ContractClass = ContractClass {
        tier: TimeOfUseTier::Single,
        voltage: VoltageLevel::Medium,
        sector: Sector::Industrial,
    };

    fn facility() -> FacilitySettings {
        FacilitySettings {
            account_id: "acc-1".into(),
            facility_id: "fac-1".into(),
            contract_class: CLASS,
            contracted_demand_kw: Some(dec!(100)),
            energy_pricing: EnergyPricing::Regulated,
        }
    }

    fn tariff(id: i64, class: ContractClass, from: Date, until: Option<Date>) -> TariffRate {
        TariffRate {
            tariff_id: id,
            contract_class: class,
            valid_from: from,
            valid_until: until,
            energy_unit_price: dec!(2),
            distribution_unit_price: dec!(1),
            demand_base_unit_price: dec!(10),
            demand_excess_unit_price: dec!(25),
            reactive_unit_price: dec!(0.5),
            btv_rate: dec!(0.05),
            vat_rate: dec!(0.2),
        }
    }

    #[test]
    fn picks_the_rate_set_in_force_for_the_month() {
        let candidates = [
            tariff(1, CLASS, date!(2023 - 01 - 01), Some(date!(2024 - 01 - 01))),
            tariff(2, CLASS, date!(2024 - 01 - 01), None),
        ];
        let period = BillingPeriod::new(2024, 4).unwrap();
        assert_eq!(resolve_tariff(&facility(), period, &candidates).unwrap().tariff_id, 2);
    }

    #[test]
    fn other_contract_classes_are_ignored() {
        let other = ContractClass {
            sector: Sector::Residential,
            ..CLASS
        };
        let candidates = [
            tariff(1, other, date!(2024 - 01 - 01), None),
            tariff(2, CLASS, date!(2024 - 01 - 01), None),
        ];
        let period = BillingPeriod::new(2024, 4).unwrap();
        assert_eq!(resolve_tariff(&facility(), period, &candidates).unwrap().tariff_id, 2);
    }

    #[test]
    fn no_match_is_an_error() {
        let candidates = [tariff(1, CLASS, date!(2025 - 01 - 01), None)];
        let period = BillingPeriod::new(2024, 4).unwrap();
        assert!(matches!(
            resolve_tariff(&facility(), period, &candidates),
            Err(BillingError::NoApplicableTariff(_))
        ));
    }

    #[test]
    fn overlapping_windows_are_ambiguous() {
        let candidates = [
            tariff(1, CLASS, date!(2024 - 01 - 01), None),
            tariff(2, CLASS, date!(2024 - 03 - 01), None),
        ];
        let period = BillingPeriod::new(2024, 4).unwrap();
        let err = resolve_tariff(&facility(), period, &candidates).unwrap_err();
        assert!(matches!(err, BillingError::NoApplicableTariff(msg) if msg.contains("ambiguous")));
    }

    #[test]
    fn negative_rates_are_rejected() {
        let mut bad = tariff(1, CLASS, date!(2024 - 01 - 01), None);
        bad.vat_rate = dec!(-0.2);
        let period = BillingPeriod::new(2024, 4).unwrap();
        assert!(matches!(
            resolve_tariff(&facility(), period, &[bad]),
            Err(BillingError::InvalidReading(_))
        ));
    }
}
