#![deny(warnings)]
#![deny(clippy::unwrap_used)]

//! One-shot probe run: `reach-probe-once [host] [port] [method]`.
//!
//! Missing arguments fall back to the stored defaults. Prints the outcome and
//! the journal, and exits non-zero on failure.

use std::process::ExitCode;
use std::sync::Arc;

use dotenv::dotenv;
use reach_probe::probe::storage::{
    DEFAULT_HOST, DEFAULT_METHOD, DEFAULT_PORT, DashMapSettingsStore, ProbeSettings, SettingsStore,
};
use reach_probe::probe::{ProbeConfig, ProbeService};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("warn".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let settings = ProbeSettings {
        host: args.next().unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: args.next().unwrap_or_else(|| DEFAULT_PORT.to_string()),
        method: args.next().unwrap_or_else(|| DEFAULT_METHOD.to_string()),
    };

    let config = ProbeConfig::from_env();
    let store: Arc<dyn SettingsStore> = Arc::new(DashMapSettingsStore::new());
    let service = ProbeService::new(&config, store);

    let outcome = service.submit(settings).await;

    print!("{}", service.sink().snapshot());
    println!("{}", outcome);

    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
