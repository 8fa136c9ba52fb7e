use std::env;

use anyhow::{bail, Context, Result};
use billing_client::domain::InvoiceVariant;
use invoice_engine::{
    config::AppConfig,
    metrics_server, observability,
    period::BillingPeriod,
    sinks::PgSnapshotStore,
    sources::PgSource,
    AuthContext, EngineSettings, InvoicePipeline, RunContext,
};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;

const USAGE: &str = "usage: invoice-engine <year> <month> <billed|offset_reconciled> [--overwrite-settled]";

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        bail!(USAGE);
    }
    let year: i32 = args[1].parse().with_context(|| format!("invalid year '{}'", args[1]))?;
    let month: i32 = args[2].parse().with_context(|| format!("invalid month '{}'", args[2]))?;
    let variant: InvoiceVariant = args[3].parse()?;
    let overwrite_settled = match args.get(4).map(String::as_str) {
        None => false,
        Some("--overwrite-settled") => true,
        Some(other) => bail!("unexpected argument '{other}'\n{USAGE}"),
    };
    let period = BillingPeriod::new(year, month)?;

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let settings = EngineSettings::from_config(&cfg.fetch, &cfg.billing)?;

    // Schema is applied out-of-band via `billing-client/sql/schema/*.sql`.
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let pipeline = InvoicePipeline::new(PgSource::new(pool.clone()), PgSnapshotStore::new(pool), settings);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling run");
                cancel.cancel();
            }
        }
    });
    let ctx = RunContext::new().with_cancellation(cancel);

    // Whoever passes --overwrite-settled on the command line is acting as admin.
    let auth = if overwrite_settled {
        AuthContext::admin("invoice-engine")
    } else {
        AuthContext::service("invoice-engine")
    };

    let summary = pipeline
        .run_period(&auth, period, variant, overwrite_settled, &ctx, cfg.run.concurrency)
        .await?;

    if !summary.is_success() {
        for (key, e) in &summary.failures {
            tracing::error!(%key, kind = e.kind(), retryable = e.is_retryable(), error = %e, "invoice not produced");
        }
        bail!(
            "{} of {} invoices failed for {period}",
            summary.failures.len(),
            summary.failures.len() + summary.settled + summary.provisional
        );
    }

    Ok(())
}
