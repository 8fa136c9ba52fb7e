use std::sync::atomic::{AtomicUsize, Ordering};

use billing_client::domain::{
    ContractClass, FacilitySettings, HourlyConsumption, HourlyMarketPrice, MonthlyDemand, TariffRate, YekdemRecord,
};
use serde::Deserialize;

use super::{PageRequest, ReferenceSource, TimeSeriesSource};
use crate::error::{BillingError, Result};
use crate::period::{BillingPeriod, TimeRange};

/// Reference rows as shipped in a dry-run JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub facilities: Vec<FacilitySettings>,
    pub tariffs: Vec<TariffRate>,
    pub demand: Vec<MonthlyDemand>,
    pub yekdem: Vec<YekdemRecord>,
    pub market_prices: Vec<HourlyMarketPrice>,
}

impl ReferenceData {
    /// Reject a file that assigns one facility id to more than one account,
    /// which the upstream schema forbids.
    pub fn validate(&self) -> Result<()> {
        let mut owners = std::collections::HashMap::new();
        for f in &self.facilities {
            if let Some(other) = owners.insert(f.facility_id.as_str(), f.account_id.as_str()) {
                if other != f.account_id {
                    return Err(BillingError::InvalidReading(format!(
                        "facility {} is assigned to both {other} and {}",
                        f.facility_id, f.account_id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// In-memory upstream, paginated the same way the database is.
#[derive(Debug, Default)]
pub struct MemorySource {
    reference: ReferenceData,
    consumption: Vec<HourlyConsumption>,
    consumption_pages_served: AtomicUsize,
    fail_consumption_at_page: Option<usize>,
}

impl MemorySource {
    pub fn new(reference: ReferenceData, consumption: Vec<HourlyConsumption>) -> Self {
        Self {
            reference,
            consumption,
            ..Self::default()
        }
    }

    /// Make the `page`-th consumption page (zero based) fail as an upstream
    /// outage would.
    pub fn fail_consumption_at_page(mut self, page: usize) -> Self {
        self.fail_consumption_at_page = Some(page);
        self
    }

    pub fn consumption_pages_served(&self) -> usize {
        self.consumption_pages_served.load(Ordering::SeqCst)
    }
}

fn page_of<T: Clone>(rows: Vec<&T>, page: PageRequest) -> Vec<T> {
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(0);
    rows.into_iter().skip(offset).take(limit).cloned().collect()
}

#[async_trait::async_trait]
impl TimeSeriesSource for MemorySource {
    async fn consumption_page(
        &self,
        facility_id: &str,
        range: TimeRange,
        page: PageRequest,
    ) -> Result<Vec<HourlyConsumption>> {
        let served = self.consumption_pages_served.fetch_add(1, Ordering::SeqCst);
        if self.fail_consumption_at_page == Some(served) {
            return Err(BillingError::DataUnavailable(format!(
                "consumption of {facility_id} at offset {}: store unavailable",
                page.offset
            )));
        }

        let mut rows: Vec<&HourlyConsumption> = self
            .consumption
            .iter()
            .filter(|r| r.facility_id == facility_id && r.ts >= range.start && r.ts < range.end)
            .collect();
        rows.sort_by_key(|r| r.ts);
        Ok(page_of(rows, page))
    }

    async fn market_price_page(&self, range: TimeRange, page: PageRequest) -> Result<Vec<HourlyMarketPrice>> {
        let mut rows: Vec<&HourlyMarketPrice> = self
            .reference
            .market_prices
            .iter()
            .filter(|p| p.ts >= range.start && p.ts < range.end)
            .collect();
        rows.sort_by_key(|p| p.ts);
        Ok(page_of(rows, page))
    }
}

#[async_trait::async_trait]
impl ReferenceSource for MemorySource {
    async fn facility(&self, account_id: &str, facility_id: &str) -> Result<Option<FacilitySettings>> {
        Ok(self
            .reference
            .facilities
            .iter()
            .find(|f| f.account_id == account_id && f.facility_id == facility_id)
            .cloned())
    }

    async fn billable_facilities(&self) -> Result<Vec<FacilitySettings>> {
        let mut facilities = self.reference.facilities.clone();
        facilities.sort_by(|a, b| (&a.account_id, &a.facility_id).cmp(&(&b.account_id, &b.facility_id)));
        Ok(facilities)
    }

    async fn monthly_demand(&self, facility_id: &str, period: BillingPeriod) -> Result<Option<MonthlyDemand>> {
        Ok(self
            .reference
            .demand
            .iter()
            .find(|d| d.facility_id == facility_id && d.period_year == period.year() && d.period_month == period.month())
            .cloned())
    }

    async fn tariff_candidates(&self, class: &ContractClass) -> Result<Vec<TariffRate>> {
        Ok(self
            .reference
            .tariffs
            .iter()
            .filter(|t| t.contract_class == *class)
            .cloned()
            .collect())
    }

    async fn yekdem_record(&self, facility_id: &str, period: BillingPeriod) -> Result<Option<YekdemRecord>> {
        Ok(self
            .reference
            .yekdem
            .iter()
            .find(|y| y.facility_id == facility_id && y.period_year == period.year() && y.period_month == period.month())
            .cloned())
    }
}
