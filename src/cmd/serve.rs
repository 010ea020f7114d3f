//! Board server command: `mission-control serve`.

use anyhow::Result;
use std::path::PathBuf;

use mission_control::board::server::{ServerConfig, start_server};
use mission_control::config::MissionConfig;

/// Command-line flags that win over file and environment settings.
pub struct ServeOverrides {
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub dev: bool,
    pub open: bool,
}

pub async fn cmd_serve(mut config: MissionConfig, overrides: ServeOverrides) -> Result<()> {
    if let Some(port) = overrides.port {
        config.server.port = port;
    }
    if let Some(dir) = overrides.data_dir {
        config.storage.data_dir = dir;
    }
    config.server.dev |= overrides.dev;

    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    // No browser inside dev containers.
    if overrides.open && !config.server.dev {
        let url = format!("http://localhost:{}", config.server.port);
        tokio::spawn(async move {
            // Give the listener a moment to bind.
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!(url = %url, error = %e, "failed to open browser");
            }
        });
    }

    start_server(ServerConfig::from(&config)).await
}
