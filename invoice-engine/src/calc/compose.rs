use billing_client::domain::{SnapshotStatus, TariffRate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::energy::EnergyCharge;
use super::{ConsumptionTotals, DemandCharges, ReactivePenalty, SubsidyReconciliation};
use crate::error::Result;
use crate::money;

/// Everything the composer needs, each component at full precision.
#[derive(Debug, Clone, Copy)]
pub struct ChargeInputs<'a> {
    pub totals: &'a ConsumptionTotals,
    pub energy: &'a EnergyCharge,
    pub tariff: &'a TariffRate,
    pub demand: &'a DemandCharges,
    pub reactive: &'a ReactivePenalty,
    pub currency_scale: u32,
}

/// The computed invoice of one facility and period. Monetary fields are
/// rounded to the currency's minor unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceBreakdown {
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
}

impl InvoiceBreakdown {
    pub fn is_provisional(&self) -> bool {
        self.status == SnapshotStatus::Provisional
    }

    /// Apply a subsidy reconciliation computed against `total_invoice`.
    pub fn with_subsidy(mut self, subsidy: &SubsidyReconciliation) -> Self {
        self.subsidy_offset = subsidy.offset;
        self.total_payable = subsidy.total_payable;
        self.unused_subsidy_credit = subsidy.unused_credit;
        self
    }
}

/// Assemble the charge lines and apply taxes.
///
/// Lines are summed in the regulated order: energy, distribution, demand
/// base, demand excess, reactive penalty. BTV is levied on the energy line
/// alone and joins the subtotal; VAT is then levied on that subtotal. The tax
/// order changes the total and must stay as it is.
///
/// Each component is computed at full precision and rounded exactly once, as
/// it is emitted. The subtotal and total are built from the emitted figures,
/// so the printed invoice adds up to the minor unit.
pub fn compose(inputs: ChargeInputs<'_>) -> Result<InvoiceBreakdown> {
    let ChargeInputs {
        totals,
        energy,
        tariff,
        demand,
        reactive,
        currency_scale,
    } = inputs;
    let round = |v: Decimal| money::round_minor(v, currency_scale);

    let distribution_raw = money::mul(
        totals.active_kwh,
        tariff.distribution_unit_price,
        "distribution charge",
    )?;
    let btv_raw = money::mul(energy.charge, tariff.btv_rate, "BTV")?;

    let energy_charge = round(energy.charge);
    let distribution_charge = round(distribution_raw);
    let demand_base_charge = round(demand.base_charge);
    let demand_excess_charge = round(demand.excess_charge);
    let reactive_penalty_charge = round(reactive.charge);
    let btv_charge = round(btv_raw);

    let lines = money::sum(
        [
            energy_charge,
            distribution_charge,
            demand_base_charge,
            demand_excess_charge,
            reactive_penalty_charge,
        ],
        "charge lines",
    )?;
    let subtotal_before_vat = money::add(lines, btv_charge, "subtotal before VAT")?;
    let vat_charge = round(money::mul(subtotal_before_vat, tariff.vat_rate, "VAT")?);
    let total_invoice = money::add(subtotal_before_vat, vat_charge, "total invoice")?;

    Ok(InvoiceBreakdown {
        status: if demand.is_final {
            SnapshotStatus::Settled
        } else {
            SnapshotStatus::Provisional
        },
        demand_final: demand.is_final,
        total_consumption_kwh: totals.active_kwh,
        unit_price_energy: energy.effective_unit_price,
        unit_price_distribution: tariff.distribution_unit_price,
        btv_rate: tariff.btv_rate,
        vat_rate: tariff.vat_rate,
        energy_charge,
        distribution_charge,
        btv_charge,
        demand_base_charge,
        demand_excess_charge,
        reactive_penalty_charge,
        subtotal_before_vat,
        vat_charge,
        total_invoice,
        subsidy_offset: Decimal::ZERO,
        total_payable: total_invoice,
        unused_subsidy_credit: Decimal::ZERO,
    })
}
