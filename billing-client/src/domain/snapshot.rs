use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

text_enum! {
    /// Which computation of a period an invoice snapshot holds.
    pub enum InvoiceVariant ("invoice variant") {
        /// The invoice as billed; subsidy offset at the official YEKDEM rate.
        Billed => "billed",
        /// The invoice after reconciliation at the custom YEKDEM rate.
        OffsetReconciled => "offset_reconciled",
    }
}

text_enum! {
    pub enum SnapshotStatus ("snapshot status") {
        /// Computed on a demand record that was not final yet.
        Provisional => "provisional",
        Settled => "settled",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidKey {
    #[error("period month {0} is outside 1..=12")]
    Month(i32),
    #[error("period year {0} is outside 2000..=2100")]
    Year(i32),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Unique key of a persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceKey {
    pub account_id: String,
    pub facility_id: String,
    pub period_year: i32,
    pub period_month: i32,
    pub variant: InvoiceVariant,
}

impl InvoiceKey {
    pub fn new(
        account_id: impl Into<String>,
        facility_id: impl Into<String>,
        period_year: i32,
        period_month: i32,
        variant: InvoiceVariant,
    ) -> Result<Self, InvalidKey> {
        let key = Self {
            account_id: account_id.into(),
            facility_id: facility_id.into(),
            period_year,
            period_month,
            variant,
        };
        key.validate()?;
        Ok(key)
    }

    pub fn validate(&self) -> Result<(), InvalidKey> {
        if self.account_id.trim().is_empty() {
            return Err(InvalidKey::Empty("account_id"));
        }
        if self.facility_id.trim().is_empty() {
            return Err(InvalidKey::Empty("facility_id"));
        }
        if !(1..=12).contains(&self.period_month) {
            return Err(InvalidKey::Month(self.period_month));
        }
        if !(2000..=2100).contains(&self.period_year) {
            return Err(InvalidKey::Year(self.period_year));
        }
        Ok(())
    }
}

impl std::fmt::Display for InvoiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{:04}-{:02}/{}",
            self.account_id, self.facility_id, self.period_year, self.period_month, self.variant
        )
    }
}

/// Row of `invoice_snapshot`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct InvoiceSnapshot {
    pub account_id: String,
    pub facility_id: String,
    pub period_year: i32,
    pub period_month: i32,
    #[sqlx(try_from = "String")]
    pub invoice_variant: InvoiceVariant,
    #[sqlx(try_from = "String")]
    pub status: SnapshotStatus,
    pub demand_final: bool,
    pub total_consumption_kwh: Decimal,
    pub unit_price_energy: Decimal,
    pub unit_price_distribution: Decimal,
    pub btv_rate: Decimal,
    pub vat_rate: Decimal,
    pub energy_charge: Decimal,
    pub distribution_charge: Decimal,
    pub btv_charge: Decimal,
    pub demand_base_charge: Decimal,
    pub demand_excess_charge: Decimal,
    pub reactive_penalty_charge: Decimal,
    pub subtotal_before_vat: Decimal,
    pub vat_charge: Decimal,
    pub total_invoice: Decimal,
    pub subsidy_offset: Decimal,
    pub total_payable: Decimal,
    pub unused_subsidy_credit: Decimal,
    pub content_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl InvoiceSnapshot {
    pub fn key(&self) -> InvoiceKey {
        InvoiceKey {
            account_id: self.account_id.clone(),
            facility_id: self.facility_id.clone(),
            period_year: self.period_year,
            period_month: self.period_month,
            variant: self.invoice_variant,
        }
    }
}
