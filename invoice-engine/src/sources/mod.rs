//! Read side of the engine: the upstream tables it consumes, behind traits so
//! the same run can be driven from PostgreSQL or from memory.

pub mod consumption_csv_file;
pub mod memory;
pub mod postgres;

pub use billing_client::db::PageRequest;
pub use consumption_csv_file::ConsumptionCsvFile;
pub use memory::{MemorySource, ReferenceData};
pub use postgres::PgSource;

use billing_client::domain::{
    ContractClass, FacilitySettings, HourlyConsumption, HourlyMarketPrice, MonthlyDemand, TariffRate, YekdemRecord,
};

use crate::error::Result;
use crate::period::{BillingPeriod, TimeRange};

/// Paginated, time-ordered series.
#[async_trait::async_trait]
pub trait TimeSeriesSource: Send + Sync {
    async fn consumption_page(
        &self,
        facility_id: &str,
        range: TimeRange,
        page: PageRequest,
    ) -> Result<Vec<HourlyConsumption>>;

    async fn market_price_page(&self, range: TimeRange, page: PageRequest) -> Result<Vec<HourlyMarketPrice>>;
}

/// Per-facility and per-period reference rows.
#[async_trait::async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn facility(&self, account_id: &str, facility_id: &str) -> Result<Option<FacilitySettings>>;

    async fn billable_facilities(&self) -> Result<Vec<FacilitySettings>>;

    async fn monthly_demand(&self, facility_id: &str, period: BillingPeriod) -> Result<Option<MonthlyDemand>>;

    async fn tariff_candidates(&self, class: &ContractClass) -> Result<Vec<TariffRate>>;

    async fn yekdem_record(&self, facility_id: &str, period: BillingPeriod) -> Result<Option<YekdemRecord>>;
}
