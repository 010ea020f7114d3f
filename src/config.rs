//! Configuration for the board server, read from `mission-control.toml`.
//!
//! Values are layered: file → environment → CLI flags. Every field has a
//! default, so a missing file or a partial file is valid.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3333
//! dev = false
//!
//! [storage]
//! data_dir = "data"
//!
//! [board]
//! task_prefix = "MC"
//!
//! [suggestions]
//! model = "claude-sonnet-4-5-20250929"
//! api_url = "https://api.anthropic.com/v1/messages"
//! timeout_secs = 60
//! # api_key = "sk-..."   (falls back to ANTHROPIC_API_KEY)
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! # directory = "logs"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "mission-control.toml";

/// Value shipped in example `.env` files; treated as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "your-api-key-here";

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub suggestions: SuggestionSettings,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Permissive CORS and bind on all interfaces for a local UI dev server.
    #[serde(default)]
    pub dev: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3333
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dev: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSection {
    /// Prefix of display numbers, e.g. `MC` in `MC-7`.
    #[serde(default = "default_task_prefix")]
    pub task_prefix: String,
}

fn default_task_prefix() -> String {
    "MC".to_string()
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            task_prefix: default_task_prefix(),
        }
    }
}

/// Settings for the text-generation service behind upgrade suggestions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

impl SuggestionSettings {
    /// The configured key, else `ANTHROPIC_API_KEY`. Blank values and the
    /// placeholder count as missing.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with(|key| std::env::var(key).ok())
    }

    pub fn api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| lookup(API_KEY_ENV))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Also write daily-rotated log files here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

impl MissionConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse mission-control.toml")
    }

    /// Load `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize mission-control.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `MC_HOST`, `MC_PORT` and `MC_DATA_DIR` from the environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("MC_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("MC_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid MC_PORT value: {}", port))?;
        }
        if let Some(dir) = lookup("MC_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Return human-readable warnings; an empty list means the config is sane.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.server.port == 0 {
            warnings.push("server.port is 0; the OS will pick a random port".to_string());
        }
        if self.board.task_prefix.trim().is_empty() {
            warnings.push("board.task_prefix is empty; display numbers will look like '-7'".to_string());
        }
        if self.suggestions.timeout_secs == 0 {
            warnings.push("suggestions.timeout_secs is 0; generation requests will fail immediately".to_string());
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            warnings.push(format!("logging.level '{}' is not a valid filter", self.logging.level));
        }
        if self.suggestions.api_key().is_none() {
            warnings.push(format!(
                "No text-generation key configured (suggestions.api_key or {}); upgrade generation is disabled",
                API_KEY_ENV
            ));
        }
        warnings
    }
}
