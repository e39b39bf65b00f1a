//! Warden - home automation health monitoring and remediation service
//!
//! Probes a home-automation endpoint on a fixed cadence, sends notifications
//! on down/recovered transitions, and power-cycles a smart-plug-controlled
//! device after repeated failures.

pub mod config;
pub mod error;
pub mod io;
pub mod monitor;
pub mod notifier;
pub mod sign;
pub mod token;
pub mod tuya;
pub mod wechat;

pub use config::{load_config, Config};
pub use error::{Result, WardenError};

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ConfigWatcher;
use crate::io::ReqwestHttpClient;
use crate::monitor::HealthMonitor;

/// Run the warden service until interrupted.
///
/// One check cycle at a time; config reloads are picked up at cycle
/// boundaries only.
pub async fn run(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mut watcher = ConfigWatcher::new(config_path);

    let http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::default());
    let mut monitor = HealthMonitor::new(&config.monitor, Arc::clone(&http));
    let mut interval = config.monitor.check_interval();

    // Setup shutdown handler
    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    tracing::info!(
        "Warden started, checking {} every {:?}",
        config.monitor.target_url,
        interval
    );

    loop {
        match watcher.poll() {
            Ok(Some(reloaded)) => {
                tracing::info!("Configuration reloaded");
                interval = reloaded.monitor.check_interval();
                monitor.update_config(&reloaded.monitor);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Config reload failed, keeping previous settings: {}", e);
            }
        }

        if let Err(e) = monitor.check().await {
            tracing::error!("Monitor check failed: {}", e);
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => {
                tracing::info!("Warden stopped");
                return Ok(());
            }
        }
    }
}
