use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use super::ContractClass;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// One regulatory rate set.
///
/// The validity window is `[valid_from, valid_until)`; an open `valid_until`
/// means the rate set is still in force. Tax rates are fractions, so `0.20`
/// is twenty percent.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct TariffRate {
    pub tariff_id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub contract_class: ContractClass,
    #[serde(with = "iso_date")]
    pub valid_from: Date,
    #[serde(with = "iso_date::option", default)]
    pub valid_until: Option<Date>,
    pub energy_unit_price: Decimal,
    pub distribution_unit_price: Decimal,
    pub demand_base_unit_price: Decimal,
    pub demand_excess_unit_price: Decimal,
    pub reactive_unit_price: Decimal,
    pub btv_rate: Decimal,
    pub vat_rate: Decimal,
}

impl TariffRate {
    /// True when the whole of `[first_day, last_day]` lies inside the window.
    pub fn covers(&self, first_day: Date, last_day: Date) -> bool {
        self.valid_from <= first_day && self.valid_until.map_or(true, |until| last_day < until)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::macros::date;

    use super::*;
    use crate::domain::{Sector, TimeOfUseTier, VoltageLevel};

    fn rate(valid_from: Date, valid_until: Option<Date>) -> TariffRate {
        TariffRate {
            tariff_id: 1,
            contract_class: ContractClass {
                tier: TimeOfUseTier::Single,
                voltage: VoltageLevel::Medium,
                sector: Sector::Industrial,
            },
            valid_from,
            valid_until,
            energy_unit_price: dec!(2.1),
            distribution_unit_price: dec!(0.9),
            demand_base_unit_price: dec!(10),
            demand_excess_unit_price: dec!(25),
            reactive_unit_price: dec!(0.5),
            btv_rate: dec!(0.05),
            vat_rate: dec!(0.20),
        }
    }

    #[test]
    fn open_window_covers_any_later_month() {
        let r = rate(date!(2024 - 01 - 01), None);
        assert!(r.covers(date!(2025 - 03 - 01), date!(2025 - 03 - 31)));
        assert!(!r.covers(date!(2023 - 12 - 01), date!(2023 - 12 - 31)));
    }

    #[test]
    fn window_must_contain_the_whole_month() {
        let r = rate(date!(2024 - 01 - 01), Some(date!(2024 - 07 - 01)));
        assert!(r.covers(date!(2024 - 06 - 01), date!(2024 - 06 - 30)));
        assert!(!r.covers(date!(2024 - 07 - 01), date!(2024 - 07 - 31)));

        let mid_month = rate(date!(2024 - 01 - 15), None);
        assert!(!mid_month.covers(date!(2024 - 01 - 01), date!(2024 - 01 - 31)));
    }

    #[test]
    fn deserializes_from_reference_json() {
        let json = r#"{
            "tariff_id": 7,
            "tier": "double",
            "voltage": "low",
            "sector": "residential",
            "valid_from": "2024-01-01",
            "valid_until": null,
            "energy_unit_price": "2.5",
            "distribution_unit_price": "1.1",
            "demand_base_unit_price": "0",
            "demand_excess_unit_price": "0",
            "reactive_unit_price": "0",
            "btv_rate": "0.01",
            "vat_rate": "0.20"
        }"#;
        let parsed: TariffRate = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.contract_class.tier, TimeOfUseTier::Double);
        assert_eq!(parsed.valid_from, date!(2024 - 01 - 01));
        assert_eq!(parsed.valid_until, None);
        assert_eq!(parsed.btv_rate, dec!(0.01));
    }
}
