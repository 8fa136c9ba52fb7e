//! The invoice run: read upstream data, price it, reconcile the subsidy and
//! persist one snapshot per key.

use std::time::Instant;

use billing_client::domain::{
    EnergyPricing, FacilitySettings, InvoiceKey, InvoiceSnapshot, InvoiceVariant, SnapshotStatus, TariffRate,
};
use futures::{stream, StreamExt};
use rust_decimal::Decimal;
use time::{OffsetDateTime, UtcOffset};

use crate::calc::{self, ChargeInputs, DemandCharges, DemandReading, InvoiceBreakdown, ReactivePenalty};
use crate::config::{BillingConfig, ConfigError, FetchConfig};
use crate::context::{AuthContext, RunContext};
use crate::error::{BillingError, Result};
use crate::fetch::TimeSeriesFetcher;
use crate::period::BillingPeriod;
use crate::sinks::SnapshotStore;
use crate::sources::{ReferenceSource, TimeSeriesSource};
use crate::{snapshot, transform};

/// Knobs of a run, resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub page_size: usize,
    pub reactive_tolerance_ratio: Decimal,
    pub utc_offset: UtcOffset,
    pub currency_scale: u32,
}

impl EngineSettings {
    pub fn from_config(fetch: &FetchConfig, billing: &BillingConfig) -> std::result::Result<Self, ConfigError> {
        billing.validate()?;
        if fetch.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(Self {
            page_size: fetch.page_size,
            reactive_tolerance_ratio: billing.reactive_tolerance_ratio,
            utc_offset: billing.utc_offset()?,
            currency_scale: billing.currency_scale,
        })
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        let billing = BillingConfig::default();
        Self {
            page_size: FetchConfig::default().page_size,
            reactive_tolerance_ratio: billing.reactive_tolerance_ratio,
            utc_offset: billing.utc_offset().unwrap_or(UtcOffset::UTC),
            currency_scale: billing.currency_scale,
        }
    }
}

/// Outcome of a period run over every billable facility.
#[derive(Debug, Default)]
pub struct PeriodSummary {
    pub settled: usize,
    pub provisional: usize,
    pub failures: Vec<(InvoiceKey, BillingError)>,
}

impl PeriodSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, key: InvoiceKey, outcome: Result<InvoiceBreakdown>) {
        match outcome {
            Ok(b) if b.is_provisional() => self.provisional += 1,
            Ok(_) => self.settled += 1,
            Err(e) => self.failures.push((key, e)),
        }
    }
}

pub struct InvoicePipeline<S, K> {
    pub source: S,
    pub store: K,
    pub settings: EngineSettings,
}

impl<S, K> InvoicePipeline<S, K>
where
    S: TimeSeriesSource + ReferenceSource,
    K: SnapshotStore,
{
    pub fn new(source: S, store: K, settings: EngineSettings) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    /// Compute the invoice for `key` and persist its snapshot.
    ///
    /// Repeating the call on unchanged upstream data rewrites nothing. A
    /// settled snapshot whose recomputation differs is only replaced when
    /// `overwrite_settled` is set by an admin.
    pub async fn compute_and_snapshot(
        &self,
        auth: &AuthContext,
        key: &InvoiceKey,
        overwrite_settled: bool,
        ctx: &RunContext,
    ) -> Result<InvoiceBreakdown> {
        auth.require_compute()?;
        if overwrite_settled {
            auth.require_overwrite_settled()?;
        }

        let started = Instant::now();
        let outcome = self.run(key, overwrite_settled, ctx).await;
        metrics::histogram!("invoice_run_duration_seconds").record(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(b) => {
                metrics::counter!("invoice_runs_total", "status" => b.status.as_str()).increment(1);
                tracing::info!(
                    %key,
                    actor = %auth.actor,
                    status = %b.status,
                    total_consumption_kwh = %b.total_consumption_kwh,
                    total_invoice = %b.total_invoice,
                    subsidy_offset = %b.subsidy_offset,
                    total_payable = %b.total_payable,
                    "invoice computed"
                );
            }
            Err(e) => {
                metrics::counter!("invoice_run_failures_total", "kind" => e.kind()).increment(1);
                tracing::error!(%key, kind = e.kind(), retryable = e.is_retryable(), error = %e, "invoice run failed");
            }
        }
        outcome
    }

    /// The stored snapshot for `key`.
    pub async fn get_snapshot(&self, auth: &AuthContext, key: &InvoiceKey) -> Result<InvoiceSnapshot> {
        key.validate()?;
        auth.require_read(&key.account_id)?;
        self.store
            .get(key)
            .await?
            .ok_or_else(|| BillingError::NotFound(key.clone()))
    }

    /// Compute and snapshot every billable facility for one period and
    /// variant, at most `concurrency` at a time. Per-facility failures are
    /// collected, not propagated.
    pub async fn run_period(
        &self,
        auth: &AuthContext,
        period: BillingPeriod,
        variant: InvoiceVariant,
        overwrite_settled: bool,
        ctx: &RunContext,
        concurrency: usize,
    ) -> Result<PeriodSummary> {
        auth.require_compute()?;
        let facilities = self.source.billable_facilities().await?;
        let keys = facilities
            .into_iter()
            .map(|f| InvoiceKey::new(f.account_id, f.facility_id, period.year(), period.month(), variant))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tracing::info!(%period, %variant, facilities = keys.len(), "period run started");

        let mut runs = stream::iter(keys)
            .map(|key| async move {
                let outcome = self.compute_and_snapshot(auth, &key, overwrite_settled, ctx).await;
                (key, outcome)
            })
            .buffer_unordered(concurrency.max(1));

        let mut summary = PeriodSummary::default();
        while let Some((key, outcome)) = runs.next().await {
            summary.record(key, outcome);
        }
        summary
            .failures
            .sort_by(|(a, _), (b, _)| (&a.account_id, &a.facility_id).cmp(&(&b.account_id, &b.facility_id)));

        tracing::info!(
            %period,
            %variant,
            settled = summary.settled,
            provisional = summary.provisional,
            failed = summary.failures.len(),
            "period run finished"
        );
        Ok(summary)
    }

    async fn run(&self, key: &InvoiceKey, overwrite_settled: bool, ctx: &RunContext) -> Result<InvoiceBreakdown> {
        let period = BillingPeriod::of_key(key)?;
        let breakdown = self.compute(key, period, ctx).await?;

        // Nothing is written once the run has been called off.
        ctx.check()?;
        self.persist(key, &breakdown, overwrite_settled).await?;
        Ok(breakdown)
    }

    /// Everything up to, not including, persistence. No side effects.
    pub async fn compute(&self, key: &InvoiceKey, period: BillingPeriod, ctx: &RunContext) -> Result<InvoiceBreakdown> {
        let facility = self
            .source
            .facility(&key.account_id, &key.facility_id)
            .await?
            .ok_or_else(|| BillingError::UnknownFacility {
                account_id: key.account_id.clone(),
                facility_id: key.facility_id.clone(),
            })?;

        let candidates = self.source.tariff_candidates(&facility.contract_class).await?;
        let tariff = calc::resolve_tariff(&facility, period, &candidates)?;

        let yekdem = self
            .source
            .yekdem_record(&key.facility_id, period)
            .await?
            .ok_or_else(|| {
                BillingError::NoApplicableYekdemRecord(format!("no record for {} in {period}", key.facility_id))
            })?;

        let demand = self.demand_charges(&facility, period, &tariff).await?;

        let range = period.time_range(self.settings.utc_offset);
        let fetcher = TimeSeriesFetcher::new(&self.source, self.settings.page_size);
        let rows = fetcher.fetch_consumption(&key.facility_id, range, ctx).await?;
        let readings = transform::validate_consumption_series(&rows, &range)?;
        if readings.len() < period.hours() {
            tracing::warn!(
                %key,
                hours_metered = readings.len(),
                hours_in_period = period.hours(),
                "consumption series has gaps"
            );
        }
        let totals = calc::aggregate(&readings)?;

        let prices = match facility.energy_pricing {
            EnergyPricing::Regulated => Vec::new(),
            EnergyPricing::MarketIndexed => fetcher
                .fetch_market_prices(range, ctx)
                .await?
                .iter()
                .map(|p| transform::validate_market_price(p, &range))
                .collect::<Result<Vec<_>>>()?,
        };
        let energy = calc::energy_charge(
            facility.energy_pricing,
            &totals,
            &readings,
            &prices,
            tariff.energy_unit_price,
        )?;
        let reactive = ReactivePenalty::calculate(
            &totals,
            self.settings.reactive_tolerance_ratio,
            tariff.reactive_unit_price,
        )?;

        let composed = calc::compose(ChargeInputs {
            totals: &totals,
            energy: &energy,
            tariff: &tariff,
            demand: &demand,
            reactive: &reactive,
            currency_scale: self.settings.currency_scale,
        })?;
        let subsidy = calc::reconcile(
            composed.total_invoice,
            totals.active_kwh,
            &yekdem,
            key.variant,
            self.settings.currency_scale,
        )?;
        let breakdown = composed.with_subsidy(&subsidy);

        if breakdown.is_provisional() {
            tracing::warn!(%key, "demand record is not final; invoice is provisional");
        }
        Ok(breakdown)
    }

    async fn demand_charges(
        &self,
        facility: &FacilitySettings,
        period: BillingPeriod,
        tariff: &TariffRate,
    ) -> Result<DemandCharges> {
        let Some(contracted_kw) = facility.contracted_demand_kw else {
            return Ok(DemandCharges::none());
        };

        let record = self
            .source
            .monthly_demand(&facility.facility_id, period)
            .await?
            .ok_or_else(|| {
                BillingError::DataUnavailable(format!(
                    "no demand record for {} in {period}",
                    facility.facility_id
                ))
            })?;

        DemandCharges::calculate(
            DemandReading::from_record(&record)?,
            contracted_kw,
            tariff.demand_base_unit_price,
            tariff.demand_excess_unit_price,
        )
    }

    /// Write the snapshot, retrying once on a lost race.
    async fn persist(&self, key: &InvoiceKey, breakdown: &InvoiceBreakdown, overwrite_settled: bool) -> Result<()> {
        let snapshot = snapshot::build_snapshot(key, breakdown, OffsetDateTime::now_utc());

        match self.try_persist(key, &snapshot, overwrite_settled).await {
            Err(BillingError::PersistenceConflict(reason)) => {
                tracing::warn!(%key, %reason, "snapshot write conflict, retrying with a fresh read");
                self.try_persist(key, &snapshot, overwrite_settled).await
            }
            other => other,
        }
    }

    async fn try_persist(&self, key: &InvoiceKey, snapshot: &InvoiceSnapshot, overwrite_settled: bool) -> Result<()> {
        if let Some(stored) = self.store.get(key).await? {
            if stored.content_hash == snapshot.content_hash {
                metrics::counter!("snapshot_unchanged_total").increment(1);
                tracing::debug!(%key, "snapshot unchanged");
                return Ok(());
            }
            if stored.status == SnapshotStatus::Settled && !overwrite_settled {
                return Err(BillingError::SettledSnapshotLocked(key.clone()));
            }
            if stored.status == SnapshotStatus::Settled {
                tracing::warn!(%key, "overwriting settled snapshot");
            }
        }

        match self.store.upsert(snapshot, overwrite_settled).await? {
            0 => Err(BillingError::PersistenceConflict(format!(
                "{key}: stored snapshot changed between read and write"
            ))),
            _ => {
                metrics::counter!("snapshot_writes_total").increment(1);
                Ok(())
            }
        }
    }
}
