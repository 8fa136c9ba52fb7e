//! The charge calculators. Everything in here is synchronous and pure: inputs
//! in, decimals out, no I/O.

pub mod aggregate;
pub mod compose;
pub mod demand;
pub mod energy;
pub mod reactive;
pub mod tariff;
pub mod yekdem;

pub use aggregate::{aggregate, ConsumptionTotals};
pub use compose::{compose, ChargeInputs, InvoiceBreakdown};
pub use demand::{DemandCharges, DemandReading};
pub use energy::energy_charge;
pub use reactive::ReactivePenalty;
pub use tariff::resolve_tariff;
pub use yekdem::{reconcile, SubsidyReconciliation};
