use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One metered hour for one facility, as delivered by the metering system.
///
/// Values stay `f64` here; the engine validates and converts them before any
/// arithmetic touches them.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct HourlyConsumption {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub facility_id: String,
    pub active_kwh: f64,
    pub inductive_kvarh: f64,
    pub capacitive_kvarh: f64,
}
