use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Hourly market clearing price, per MWh.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct HourlyMarketPrice {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub price_per_mwh: f64,
}
