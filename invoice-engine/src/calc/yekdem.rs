use billing_client::domain::{InvoiceVariant, YekdemRecord};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::{BillingError, Result};
use crate::money;

const KWH_PER_MWH: Decimal = dec!(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubsidyReconciliation {
    pub rate_per_mwh: Decimal,
    /// Credit against the invoice, rounded to the minor unit.
    pub offset: Decimal,
    pub total_payable: Decimal,
    /// Part of the offset the invoice could not absorb. Reported, never paid
    /// out and never carried into another period.
    pub unused_credit: Decimal,
}

/// Offset the renewable subsidy against a composed (already rounded) total.
///
/// `billed` uses the official rate, `offset_reconciled` the custom one. The
/// payable total is clamped at zero.
pub fn reconcile(
    total_invoice: Decimal,
    active_kwh: Decimal,
    record: &YekdemRecord,
    variant: InvoiceVariant,
    scale: u32,
) -> Result<SubsidyReconciliation> {
    let rate_per_mwh = match variant {
        InvoiceVariant::Billed => record.official_rate_per_mwh,
        InvoiceVariant::OffsetReconciled => record.custom_rate_per_mwh.ok_or_else(|| {
            BillingError::NoApplicableYekdemRecord(format!(
                "no custom rate for {} in {:04}-{:02}",
                record.facility_id, record.period_year, record.period_month
            ))
        })?,
    };
    if rate_per_mwh.is_sign_negative() && !rate_per_mwh.is_zero() {
        return Err(BillingError::InvalidReading(format!(
            "YEKDEM rate for {} is negative ({rate_per_mwh})",
            record.facility_id
        )));
    }

    let mwh = money::div(active_kwh, KWH_PER_MWH, "consumption in MWh")?;
    let raw = money::add(
        money::mul(rate_per_mwh, mwh, "subsidy offset")?,
        record.adjustment,
        "subsidy offset",
    )?;
    if raw.is_sign_negative() && !raw.is_zero() {
        tracing::warn!(
            facility_id = %record.facility_id,
            offset = %raw,
            "negative subsidy offset clamped to zero"
        );
    }
    let offset = money::round_minor(money::floor_zero(raw), scale);

    Ok(SubsidyReconciliation {
        rate_per_mwh,
        offset,
        total_payable: money::floor_zero(money::sub(total_invoice, offset, "total payable")?),
        unused_credit: money::floor_zero(money::sub(offset, total_invoice, "unused subsidy credit")?),
    })
}
