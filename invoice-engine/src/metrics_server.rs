use std::net::SocketAddr;

use anyhow::Context;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder and serve `/metrics` on `bind_addr`.
pub fn init(bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid metrics bind address '{bind_addr}'"))?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")?;
    // Only the first install wins.
    let _ = PROM_HANDLE.set(handle);
    describe();

    tokio::spawn(async move {
        let app = Router::new().route("/metrics", get(metrics_handler));

        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, "serving metrics");
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics listener");
            }
        }
    });
    Ok(())
}

fn describe() {
    metrics::describe_counter!("fetch_pages_total", "Time-series pages read, by series");
    metrics::describe_counter!("fetch_rows_total", "Time-series rows read, by series");
    metrics::describe_counter!("invoice_runs_total", "Completed invoice runs, by snapshot status");
    metrics::describe_counter!("invoice_run_failures_total", "Failed invoice runs, by error kind");
    metrics::describe_counter!("snapshot_writes_total", "Snapshots inserted or replaced");
    metrics::describe_counter!("snapshot_unchanged_total", "Runs whose snapshot was already up to date");
    metrics::describe_counter!("snapshot_write_conflicts_total", "Snapshot writes that lost a race");
    metrics::describe_counter!("source_read_errors_total", "Failed reads of upstream tables");
    metrics::describe_histogram!("invoice_run_duration_seconds", "Wall time of one invoice run");
}

async fn metrics_handler() -> String {
    PROM_HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}
