use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ContractClass;

text_enum! {
    /// How the energy component of the invoice is priced.
    pub enum EnergyPricing ("energy pricing") {
        /// Flat regulated unit price per kWh.
        Regulated => "regulated",
        /// Hourly market clearing price plus the tariff's unit price as adder.
        MarketIndexed => "market_indexed",
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct FacilitySettings {
    pub account_id: String,
    pub facility_id: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub contract_class: ContractClass,
    /// `None` for facilities without demand metering.
    pub contracted_demand_kw: Option<Decimal>,
    #[sqlx(try_from = "String")]
    pub energy_pricing: EnergyPricing,
}
