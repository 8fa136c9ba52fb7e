use serde::{Deserialize, Serialize};

/// Monthly peak demand reading. `peak_kw` is the raw meter value; the
/// transformation `multiplier` still has to be applied.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct MonthlyDemand {
    pub facility_id: String,
    pub period_year: i32,
    pub period_month: i32,
    pub peak_kw: f64,
    pub is_final: bool,
    pub multiplier: f64,
}
