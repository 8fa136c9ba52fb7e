use billing_client::db::{consumption_queries, reference_queries, PageRequest};
use billing_client::domain::{
    ContractClass, FacilitySettings, HourlyConsumption, HourlyMarketPrice, MonthlyDemand, TariffRate, YekdemRecord,
};
use sqlx::PgPool;

use super::{ReferenceSource, TimeSeriesSource};
use crate::error::{BillingError, Result};
use crate::period::{BillingPeriod, TimeRange};

/// Reads every upstream table from the billing database.
#[derive(Clone)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(what: String) -> impl FnOnce(anyhow::Error) -> BillingError {
    move |e| {
        metrics::counter!("source_read_errors_total").increment(1);
        tracing::warn!(error = %e, what = %what, "upstream read failed");
        BillingError::DataUnavailable(format!("{what}: {e}"))
    }
}

#[async_trait::async_trait]
impl TimeSeriesSource for PgSource {
    async fn consumption_page(
        &self,
        facility_id: &str,
        range: TimeRange,
        page: PageRequest,
    ) -> Result<Vec<HourlyConsumption>> {
        consumption_queries::consumption_page(&self.pool, facility_id, range.start, range.end, page)
            .await
            .map_err(unavailable(format!("consumption of {facility_id} at offset {}", page.offset)))
    }

    async fn market_price_page(&self, range: TimeRange, page: PageRequest) -> Result<Vec<HourlyMarketPrice>> {
        consumption_queries::market_price_page(&self.pool, range.start, range.end, page)
            .await
            .map_err(unavailable(format!("market prices at offset {}", page.offset)))
    }
}

#[async_trait::async_trait]
impl ReferenceSource for PgSource {
    async fn facility(&self, account_id: &str, facility_id: &str) -> Result<Option<FacilitySettings>> {
        reference_queries::facility_settings(&self.pool, account_id, facility_id)
            .await
            .map_err(unavailable(format!("facility {account_id}/{facility_id}")))
    }

    async fn billable_facilities(&self) -> Result<Vec<FacilitySettings>> {
        reference_queries::billable_facilities(&self.pool)
            .await
            .map_err(unavailable("billable facilities".to_string()))
    }

    async fn monthly_demand(&self, facility_id: &str, period: BillingPeriod) -> Result<Option<MonthlyDemand>> {
        reference_queries::monthly_demand(&self.pool, facility_id, period.year(), period.month())
            .await
            .map_err(unavailable(format!("demand of {facility_id} for {period}")))
    }

    async fn tariff_candidates(&self, class: &ContractClass) -> Result<Vec<TariffRate>> {
        reference_queries::tariff_candidates(&self.pool, class)
            .await
            .map_err(unavailable(format!("tariffs of {class}")))
    }

    async fn yekdem_record(&self, facility_id: &str, period: BillingPeriod) -> Result<Option<YekdemRecord>> {
        reference_queries::yekdem_record(&self.pool, facility_id, period.year(), period.month())
            .await
            .map_err(unavailable(format!("YEKDEM of {facility_id} for {period}")))
    }
}
