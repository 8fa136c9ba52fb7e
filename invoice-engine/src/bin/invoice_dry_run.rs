use std::{env, fs};

use anyhow::{bail, Context, Result};
use billing_client::domain::{InvoiceKey, InvoiceVariant};
use invoice_engine::{
    observability,
    sinks::MemorySnapshotStore,
    sources::{ConsumptionCsvFile, MemorySource, ReferenceData},
    AuthContext, EngineSettings, InvoicePipeline, RunContext,
};

/// Computes one invoice from local files and prints the breakdown as JSON.
/// Nothing is read from or written to the database.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 7 {
        bail!(
            "usage: invoice_dry_run <consumption.csv> <reference.json> <account_id> <facility_id> <year> <month> \
             [billed|offset_reconciled]"
        );
    }

    let consumption = ConsumptionCsvFile::new(&args[1]).load()?;
    let reference: ReferenceData = {
        let raw = fs::read_to_string(&args[2]).with_context(|| format!("failed to read {}", args[2]))?;
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", args[2]))?
    };
    reference.validate()?;
    let year: i32 = args[5].parse().with_context(|| format!("invalid year '{}'", args[5]))?;
    let month: i32 = args[6].parse().with_context(|| format!("invalid month '{}'", args[6]))?;
    let variant = match args.get(7) {
        Some(v) => v.parse()?,
        None => InvoiceVariant::Billed,
    };
    let key = InvoiceKey::new(args[3].as_str(), args[4].as_str(), year, month, variant)?;

    let pipeline = InvoicePipeline::new(
        MemorySource::new(reference, consumption),
        MemorySnapshotStore::new(),
        EngineSettings::default(),
    );
    let breakdown = pipeline
        .compute_and_snapshot(&AuthContext::service("invoice_dry_run"), &key, false, &RunContext::new())
        .await?;

    println!("{}", serde_json::to_string_pretty(&breakdown)?);
    Ok(())
}
