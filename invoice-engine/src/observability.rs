use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. Logs go to stderr so binaries can print
/// machine-readable output on stdout.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("invoice_engine=info,billing_client=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}
