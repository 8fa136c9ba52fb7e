//! Validation of upstream time-series rows before they reach any arithmetic.
//!
//! Rows are checked and converted to decimals here; nothing is coerced. A row
//! that fails is reported as `InvalidReading` with enough context for an
//! operator to find it.

use billing_client::domain::{HourlyConsumption, HourlyMarketPrice};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::error::{BillingError, Result};
use crate::money;
use crate::period::TimeRange;

/// A validated metered hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourlyReading {
    pub ts: OffsetDateTime,
    pub active_kwh: Decimal,
    pub inductive_kvarh: Decimal,
    pub capacitive_kvarh: Decimal,
}

/// A validated market clearing price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub ts: OffsetDateTime,
    pub price_per_mwh: Decimal,
}

/// Validate one consumption row.
///
/// Rules:
/// - the timestamp is hour-aligned and inside `range`;
/// - every energy value is finite and non-negative.
pub fn validate_hourly_consumption(row: &HourlyConsumption, range: &TimeRange) -> Result<HourlyReading> {
    check_timestamp(row.ts, range, &row.facility_id)?;

    let at = |field: &str| format!("{field} of {} at {}", row.facility_id, row.ts);
    Ok(HourlyReading {
        ts: row.ts,
        active_kwh: money::from_reading(row.active_kwh, &at("active_kwh"))?,
        inductive_kvarh: money::from_reading(row.inductive_kvarh, &at("inductive_kvarh"))?,
        capacitive_kvarh: money::from_reading(row.capacitive_kvarh, &at("capacitive_kvarh"))?,
    })
}

/// Validate a full consumption series: each row, plus strictly ascending
/// timestamps so that no hour is counted twice.
pub fn validate_consumption_series(rows: &[HourlyConsumption], range: &TimeRange) -> Result<Vec<HourlyReading>> {
    let mut readings = Vec::with_capacity(rows.len());
    let mut previous: Option<OffsetDateTime> = None;

    for row in rows {
        let reading = validate_hourly_consumption(row, range)?;
        if let Some(prev) = previous {
            if reading.ts <= prev {
                return Err(BillingError::InvalidReading(format!(
                    "consumption of {} is not strictly ascending: {} follows {}",
                    row.facility_id, reading.ts, prev
                )));
            }
        }
        previous = Some(reading.ts);
        readings.push(reading);
    }

    Ok(readings)
}

pub fn validate_market_price(row: &HourlyMarketPrice, range: &TimeRange) -> Result<PricePoint> {
    check_timestamp(row.ts, range, "market price")?;
    Ok(PricePoint {
        ts: row.ts,
        price_per_mwh: money::from_reading(row.price_per_mwh, &format!("market price at {}", row.ts))?,
    })
}

fn check_timestamp(ts: OffsetDateTime, range: &TimeRange, subject: &str) -> Result<()> {
    if ts < range.start || ts >= range.end {
        return Err(BillingError::InvalidReading(format!(
            "{subject}: timestamp {ts} outside [{}, {})",
            range.start, range.end
        )));
    }
    if ts.minute() != 0 || ts.second() != 0 || ts.nanosecond() != 0 {
        return Err(BillingError::InvalidReading(format!(
            "{subject}: timestamp {ts} is not hour-aligned"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    use super::*;

    fn range() -> TimeRange {
        TimeRange {
            start: datetime!(2024-01-01 00:00 +3),
            end: datetime!(2024-02-01 00:00 +3),
        }
    }

    fn row(ts: OffsetDateTime, kwh: f64) -> HourlyConsumption {
        HourlyConsumption {
            ts,
            facility_id: "fac-1".to_string(),
            active_kwh: kwh,
            inductive_kvarh: 0.25,
            capacitive_kvarh: 0.0,
        }
    }

    #[test]
    fn consumption_validation_accepts_valid_row() {
        let reading = validate_hourly_consumption(&row(datetime!(2024-01-01 05:00 +3), 1.5), &range()).unwrap();
        assert_eq!(reading.active_kwh, dec!(1.5));
        assert_eq!(reading.inductive_kvarh, dec!(0.25));
    }

    #[test]
    fn consumption_validation_rejects_negative_kwh() {
        let res = validate_hourly_consumption(&row(datetime!(2024-01-01 05:00 +3), -0.1), &range());
        assert!(matches!(res, Err(BillingError::InvalidReading(_))));
    }

    #[test]
    fn consumption_validation_rejects_nan() {
        let res = validate_hourly_consumption(&row(datetime!(2024-01-01 05:00 +3), f64::NAN), &range());
        assert!(matches!(res, Err(BillingError::InvalidReading(_))));
    }

    #[test]
    fn consumption_validation_rejects_out_of_range_ts() {
        let res = validate_hourly_consumption(&row(datetime!(2024-02-01 00:00 +3), 1.0), &range());
        assert!(matches!(res, Err(BillingError::InvalidReading(_))));
    }

    #[test]
    fn consumption_validation_rejects_unaligned_ts() {
        let res = validate_hourly_consumption(&row(datetime!(2024-01-03 10:15 +3), 1.0), &range());
        assert!(matches!(res, Err(BillingError::InvalidReading(_))));
    }

    #[test]
    fn duplicate_hours_are_rejected() {
        let ts = datetime!(2024-01-03 10:00 +3);
        let res = validate_consumption_series(&[row(ts, 1.0), row(ts, 1.0)], &range());
        assert!(matches!(res, Err(BillingError::InvalidReading(msg)) if msg.contains("strictly ascending")));
    }

    #[test]
    fn market_price_validation_converts_to_decimal() {
        let price = HourlyMarketPrice {
            ts: datetime!(2024-01-10 13:00 +3),
            price_per_mwh: 2450.75,
        };
        assert_eq!(validate_market_price(&price, &range()).unwrap().price_per_mwh, dec!(2450.75));
    }
}
