//! Turning a breakdown into the persisted snapshot row.

use billing_client::domain::{InvoiceKey, InvoiceSnapshot};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::calc::InvoiceBreakdown;

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    let len = s.len() as u32;
    hasher.update(&len.to_le_bytes());
    hasher.update(s.as_bytes());
}

/// Decimals hash by value: `1.50` and `1.5` give the same digest.
fn hash_decimal(hasher: &mut blake3::Hasher, v: Decimal) {
    hash_str(hasher, &v.normalize().to_string());
}

/// Digest of everything a snapshot states about its key, excluding
/// `updated_at`. Equal digests mean a rewrite would change nothing.
pub fn content_hash(key: &InvoiceKey, b: &InvoiceBreakdown) -> String {
    let mut h = blake3::Hasher::new();
    hash_str(&mut h, &key.account_id);
    hash_str(&mut h, &key.facility_id);
    h.update(&key.period_year.to_le_bytes());
    h.update(&key.period_month.to_le_bytes());
    hash_str(&mut h, key.variant.as_str());
    hash_str(&mut h, b.status.as_str());
    h.update(&[u8::from(b.demand_final)]);

    for v in [
        b.total_consumption_kwh,
        b.unit_price_energy,
        b.unit_price_distribution,
        b.btv_rate,
        b.vat_rate,
        b.energy_charge,
        b.distribution_charge,
        b.btv_charge,
        b.demand_base_charge,
        b.demand_excess_charge,
        b.reactive_penalty_charge,
        b.subtotal_before_vat,
        b.vat_charge,
        b.total_invoice,
        b.subsidy_offset,
        b.total_payable,
        b.unused_subsidy_credit,
    ] {
        hash_decimal(&mut h, v);
    }

    h.finalize().to_hex().to_string()
}

pub fn build_snapshot(key: &InvoiceKey, b: &InvoiceBreakdown, updated_at: OffsetDateTime) -> InvoiceSnapshot {
    InvoiceSnapshot {
        account_id: key.account_id.clone(),
        facility_id: key.facility_id.clone(),
        period_year: key.period_year,
        period_month: key.period_month,
        invoice_variant: key.variant,
        status: b.status,
        demand_final: b.demand_final,
        total_consumption_kwh: b.total_consumption_kwh,
        unit_price_energy: b.unit_price_energy,
        unit_price_distribution: b.unit_price_distribution,
        btv_rate: b.btv_rate,
        vat_rate: b.vat_rate,
        energy_charge: b.energy_charge,
        distribution_charge: b.distribution_charge,
        btv_charge: b.btv_charge,
        demand_base_charge: b.demand_base_charge,
        demand_excess_charge: b.demand_excess_charge,
        reactive_penalty_charge: b.reactive_penalty_charge,
        subtotal_before_vat: b.subtotal_before_vat,
        vat_charge: b.vat_charge,
        total_invoice: b.total_invoice,
        subsidy_offset: b.subsidy_offset,
        total_payable: b.total_payable,
        unused_subsidy_credit: b.unused_subsidy_credit,
        content_hash: content_hash(key, b),
        updated_at,
    }
}

/// The breakdown a stored snapshot describes.
pub fn breakdown_of(s: &InvoiceSnapshot) -> InvoiceBreakdown {
    InvoiceBreakdown {
        status: s.status,
        demand_final: s.demand_final,
        total_consumption_kwh: s.total_consumption_kwh,
        unit_price_energy: s.unit_price_energy,
        unit_price_distribution: s.unit_price_distribution,
        btv_rate: s.btv_rate,
        vat_rate: s.vat_rate,
        energy_charge: s.energy_charge,
        distribution_charge: s.distribution_charge,
        btv_charge: s.btv_charge,
        demand_base_charge: s.demand_base_charge,
        demand_excess_charge: s.demand_excess_charge,
        reactive_penalty_charge: s.reactive_penalty_charge,
        subtotal_before_vat: s.subtotal_before_vat,
        vat_charge: s.vat_charge,
        total_invoice: s.total_invoice,
        subsidy_offset: s.subsidy_offset,
        total_payable: s.total_payable,
        unused_subsidy_credit: s.unused_subsidy_credit,
    }
}
