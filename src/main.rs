use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;

use mission_control::config::{CONFIG_FILE, MissionConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "mission-control")]
#[command(version, about = "Personal kanban board with AI upgrade suggestions")]
pub struct Cli {
    /// Debug logging for mission-control itself
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP + WebSocket board server
    Serve {
        /// Port to listen on (overrides config and MC_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Directory holding the JSON data files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Permissive CORS and bind on all interfaces
        #[arg(long)]
        dev: bool,
        /// Open the board in a browser once the server is up
        #[arg(long)]
        open: bool,
    },
    /// Import tasks from a KANBAN.md file
    Migrate {
        /// Markdown board to import
        file: PathBuf,
        /// Directory holding the JSON data files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Replace existing tasks
        #[arg(long)]
        force: bool,
    },
    /// View, validate or create the configuration file
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default mission-control.toml
    Init,
}

/// Load configuration (file, then environment) and install logging. The
/// returned guard flushes file logs on drop.
fn setup(cli: &Cli) -> Result<(MissionConfig, Option<WorkerGuard>)> {
    let mut config = MissionConfig::load_or_default(&cli.config)?;
    config.apply_env()?;
    let guard = mission_control::logging::init(&config.logging, cli.verbose)?;
    Ok((config, guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve {
            port,
            data_dir,
            dev,
            open,
        } => {
            let (config, _log_guard) = setup(&cli)?;
            let overrides = cmd::ServeOverrides {
                port: *port,
                data_dir: data_dir.clone(),
                dev: *dev,
                open: *open,
            };
            cmd::cmd_serve(config, overrides).await?;
        }
        Commands::Migrate {
            file,
            data_dir,
            force,
        } => {
            let (config, _log_guard) = setup(&cli)?;
            cmd::cmd_migrate(&config, file, data_dir.clone(), *force)?;
        }
        Commands::Config { command } => cmd::cmd_config(&cli.config, command.clone())?,
    }

    Ok(())
}
