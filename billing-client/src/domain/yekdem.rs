use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Renewable support (YEKDEM) values for one facility and month. Rates are per
/// MWh; `adjustment` is a flat amount added to the computed offset.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct YekdemRecord {
    pub facility_id: String,
    pub period_year: i32,
    pub period_month: i32,
    pub official_rate_per_mwh: Decimal,
    pub custom_rate_per_mwh: Option<Decimal>,
    pub adjustment: Decimal,
}
