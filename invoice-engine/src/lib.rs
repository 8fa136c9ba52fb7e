//! Electricity invoice engine: prices a facility's month of metering against
//! its regulated tariff, reconciles the YEKDEM subsidy and keeps one snapshot
//! per invoice key.

pub mod calc;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod metrics_server;
pub mod money;
pub mod observability;
pub mod period;
pub mod pipeline;
pub mod sinks;
pub mod snapshot;
pub mod sources;
pub mod transform;

pub use calc::InvoiceBreakdown;
pub use context::{AuthContext, RunContext};
pub use error::{BillingError, Result};
pub use pipeline::{EngineSettings, InvoicePipeline, PeriodSummary};
