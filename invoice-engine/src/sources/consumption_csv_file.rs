use std::{fs::File, path::PathBuf};

use billing_client::domain::HourlyConsumption;
use csv::StringRecord;
use time::OffsetDateTime;

use crate::error::{BillingError, Result};

/// CSV export of hourly consumption, for dry runs without a database.
///
/// Expected header columns (by name):
/// - ts (RFC3339 timestamp)
/// - facility_id
/// - active_kwh
/// - inductive_kvarh (optional, empty means 0)
/// - capacitive_kvarh (optional, empty means 0)
pub struct ConsumptionCsvFile {
    path: PathBuf,
}

impl ConsumptionCsvFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Vec<HourlyConsumption>> {
        let file = File::open(&self.path).map_err(|e| {
            BillingError::DataUnavailable(format!("failed to open {}: {e}", self.path.display()))
        })?;
        let mut rdr = csv::Reader::from_reader(file);
        let headers = rdr
            .headers()
            .map_err(|e| BillingError::DataUnavailable(format!("failed to read CSV headers: {e}")))?
            .clone();

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record =
                result.map_err(|e| BillingError::DataUnavailable(format!("failed to read CSV record: {e}")))?;
            let row = record_to_consumption(&record, &headers).map_err(|e| match e {
                BillingError::InvalidReading(msg) => BillingError::InvalidReading(format!("record {}: {msg}", line + 1)),
                other => other,
            })?;
            rows.push(row);
        }

        Ok(rows)
    }
}

fn parse_f64(name: &str, s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|e| BillingError::InvalidReading(format!("invalid {name} '{s}': {e}")))
}

fn parse_optional_f64(name: &str, s: Option<&str>) -> Result<f64> {
    match s.map(str::trim) {
        None | Some("") => Ok(0.0),
        Some(v) => parse_f64(name, v),
    }
}

fn column<'r>(record: &'r StringRecord, headers: &StringRecord, name: &str) -> Option<&'r str> {
    headers
        .iter()
        .position(|h| h == name)
        .and_then(|idx| record.get(idx))
}

fn require_column<'r>(record: &'r StringRecord, headers: &StringRecord, name: &str) -> Result<&'r str> {
    column(record, headers, name)
        .ok_or_else(|| BillingError::InvalidReading(format!("missing column '{name}' in CSV record")))
}

fn record_to_consumption(record: &StringRecord, headers: &StringRecord) -> Result<HourlyConsumption> {
    let ts_str = require_column(record, headers, "ts")?;
    let ts = OffsetDateTime::parse(ts_str.trim(), &time::format_description::well_known::Rfc3339)
        .map_err(|e| BillingError::InvalidReading(format!("invalid ts '{ts_str}': {e}")))?;

    Ok(HourlyConsumption {
        ts,
        facility_id: require_column(record, headers, "facility_id")?.trim().to_string(),
        active_kwh: parse_f64("active_kwh", require_column(record, headers, "active_kwh")?)?,
        inductive_kvarh: parse_optional_f64("inductive_kvarh", column(record, headers, "inductive_kvarh"))?,
        capacitive_kvarh: parse_optional_f64("capacitive_kvarh", column(record, headers, "capacitive_kvarh"))?,
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn headers() -> StringRecord {
        StringRecord::from(vec!["ts", "facility_id", "active_kwh", "inductive_kvarh", "capacitive_kvarh"])
    }

    #[test]
    fn parses_a_full_record() {
        let record = StringRecord::from(vec!["2024-01-01T05:00:00+03:00", "fac-1", "12.5", "3", ""]);
        let row = record_to_consumption(&record, &headers()).unwrap();
        assert_eq!(row.ts, datetime!(2024-01-01 05:00 +3));
        assert_eq!(row.facility_id, "fac-1");
        assert_eq!(row.active_kwh, 12.5);
        assert_eq!(row.inductive_kvarh, 3.0);
        assert_eq!(row.capacitive_kvarh, 0.0);
    }

    #[test]
    fn rejects_unparsable_energy() {
        let record = StringRecord::from(vec!["2024-01-01T05:00:00+03:00", "fac-1", "lots", "0", "0"]);
        assert!(matches!(
            record_to_consumption(&record, &headers()),
            Err(BillingError::InvalidReading(_))
        ));
    }

    #[test]
    fn missing_optional_columns_default_to_zero() {
        let headers = StringRecord::from(vec!["ts", "facility_id", "active_kwh"]);
        let record = StringRecord::from(vec!["2024-01-01T05:00:00+03:00", "fac-1", "1"]);
        let row = record_to_consumption(&record, &headers).unwrap();
        assert_eq!(row.inductive_kvarh, 0.0);
    }
}
