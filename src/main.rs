#![deny(warnings)]
#![deny(clippy::unwrap_used)]

use std::sync::Arc;

use dotenv::dotenv;
use poem::{EndpointExt, Server, listener::TcpListener, middleware::Tracing};
use reach_probe::probe::storage::{DashMapSettingsStore, SettingsStore, activate, deactivate};
use reach_probe::probe::{ProbeConfig, ProbeService, admin};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Initialize logging with proper tracing default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().expect("valid directive")),
        )
        .init();

    let config = ProbeConfig::from_env();

    let store: Arc<dyn SettingsStore> = match &config.settings_path {
        Some(path) => {
            info!("Persisting settings to {}", path.display());
            Arc::new(DashMapSettingsStore::with_file(path))
        }
        None => Arc::new(DashMapSettingsStore::new()),
    };

    let service = Arc::new(ProbeService::new(&config, store.clone()));
    activate(store.as_ref(), service.sink());

    // Loopback only: the admin surface can trigger outbound connections.
    let admin_addr = format!("127.0.0.1:{}", config.admin_port);
    info!("Starting admin server on {}", admin_addr);

    let app = admin::routes(service.clone()).with(Tracing);

    let result = Server::new(TcpListener::bind(admin_addr))
        .name("Reach Probe Admin")
        .run_with_graceful_shutdown(
            app,
            async {
                let _ = tokio::signal::ctrl_c().await;
            },
            None,
        )
        .await;

    deactivate(store.as_ref(), service.sink());
    result?;

    Ok(())
}
