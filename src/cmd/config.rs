//! Configuration view and validation commands: `mission-control config`.

use anyhow::Result;
use std::path::Path;

use mission_control::config::{LogFormat, MissionConfig};

use crate::ConfigCommands;

pub fn cmd_config(config_path: &Path, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Mission Control Configuration");
            println!("=============================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config file at {}; using defaults.", config_path.display());
            }
            println!();

            let mut config = MissionConfig::load_or_default(config_path)?;
            config.apply_env()?;

            println!("[server]");
            println!("  host = \"{}\"", config.server.host);
            println!("  port = {}", config.server.port);
            println!("  dev = {}", config.server.dev);
            println!();
            println!("[storage]");
            println!("  data_dir = \"{}\"", config.storage.data_dir.display());
            println!();
            println!("[board]");
            println!("  task_prefix = \"{}\"", config.board.task_prefix);
            println!();
            println!("[suggestions]");
            println!("  model = \"{}\"", config.suggestions.model);
            println!("  api_url = \"{}\"", config.suggestions.api_url);
            println!("  timeout_secs = {}", config.suggestions.timeout_secs);
            let key_state = if config.suggestions.api_key().is_some() {
                "configured"
            } else {
                "missing"
            };
            println!("  api_key = <{}>", key_state);
            println!();
            println!("[logging]");
            println!("  level = \"{}\"", config.logging.level);
            let format = match config.logging.format {
                LogFormat::Pretty => "pretty",
                LogFormat::Json => "json",
            };
            println!("  format = \"{}\"", format);
            if let Some(dir) = &config.logging.directory {
                println!("  directory = \"{}\"", dir.display());
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = MissionConfig::load_or_default(config_path)?;
            let warnings = config.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists.", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            MissionConfig::default().save(config_path)?;

            println!("Created {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] host, port, dev");
            println!("  - [storage] data_dir");
            println!("  - [suggestions] model, timeout_secs, api_key");
            println!();
        }
    }

    Ok(())
}
