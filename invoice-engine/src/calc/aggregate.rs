use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Result;
use crate::money;
use crate::transform::HourlyReading;

/// Monthly energy totals of one facility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumptionTotals {
    pub active_kwh: Decimal,
    pub inductive_kvarh: Decimal,
    pub capacitive_kvarh: Decimal,
    pub hours: usize,
}

/// Sum validated readings. No readings is a valid, all-zero month.
pub fn aggregate(readings: &[HourlyReading]) -> Result<ConsumptionTotals> {
    readings.iter().try_fold(ConsumptionTotals::default(), |acc, r| {
        Ok(ConsumptionTotals {
            active_kwh: money::add(acc.active_kwh, r.active_kwh, "total active energy")?,
            inductive_kvarh: money::add(acc.inductive_kvarh, r.inductive_kvarh, "total inductive energy")?,
            capacitive_kvarh: money::add(acc.capacitive_kvarh, r.capacitive_kvarh, "total capacitive energy")?,
            hours: acc.hours + 1,
        })
    })
}
