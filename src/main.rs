//! Medical Insurance Dashboard
//!
//! Reads configuration from a TOML file
//! (`~/.config/insurance-dashboard/config.toml`, or `$INSURANCE_CONFIG`).

use std::path::PathBuf;

use tracing::{error, info};

use insurance_dashboard::{
    default_config_path, init_tracing, AppConfig, ServerHandle, ServerOptions, CONFIG_ENV_VAR,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let config = AppConfig::load(&config_path)?;

    init_tracing(&config);
    info!("Configuration loaded from {}", config_path.display());

    let handle = match ServerHandle::start(ServerOptions {
        config,
        ..Default::default()
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    handle.install_signal_handler();
    handle.wait().await;
    Ok(())
}
