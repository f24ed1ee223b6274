//! Configuration loading for Mammoscan.
//! Reads mammoscan.toml from the path given on the command line / in
//! MAMMOSCAN_CONFIG, or from the current directory. Every field has a default,
//! so a missing file is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mammoscan_client::{resolve_base_url, ClientConfig};
use mammoscan_common::{MammoscanError, Result};
use serde::{Deserialize, Serialize};

use crate::progress::ProgressSettings;
use crate::upload::UploadSettings;

pub const DEFAULT_CONFIG_FILE: &str = "mammoscan.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_origin()       -> String { mammoscan_client::client::DEFAULT_ORIGIN.to_string() }
fn default_base_path()    -> String { mammoscan_client::client::DEFAULT_BASE_PATH.to_string() }
fn default_timeout_secs() -> u64    { mammoscan_client::client::DEFAULT_TIMEOUT_SECS }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            base_path: default_base_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    #[serde(default = "default_progress_tick_ms")]
    pub progress_tick_ms: u64,
    #[serde(default = "default_progress_step")]
    pub progress_step: u8,
    #[serde(default = "default_progress_ceiling")]
    pub progress_ceiling: u8,
    #[serde(default = "default_completion_hold_ms")]
    pub completion_hold_ms: u64,
}

fn default_max_size_bytes()     -> u64 { 50 * 1024 * 1024 }
fn default_progress_tick_ms()   -> u64 { 200 }
fn default_progress_step()      -> u8  { 10 }
fn default_progress_ceiling()   -> u8  { 90 }
fn default_completion_hold_ms() -> u64 { 500 }

fn default_allowed_types() -> Vec<String> {
    crate::upload::DEFAULT_ALLOWED_TYPES.iter().map(|s| s.to_string()).collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            allowed_types: default_allowed_types(),
            progress_tick_ms: default_progress_tick_ms(),
            progress_step: default_progress_step(),
            progress_ceiling: default_progress_ceiling(),
            completion_hold_ms: default_completion_hold_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String { "mammoscan=info,mammoscan_app=info,mammoscan_client=info,warn".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_log_filter() }
    }
}


impl Config {
    /// Load configuration.
    /// An explicit path must exist; otherwise mammoscan.toml in the current
    /// directory is used when present, and defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    return Err(MammoscanError::Config(format!(
                        "config file not found: {}", p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let u = &self.upload;
        if u.max_size_bytes == 0 {
            return Err(MammoscanError::Config("upload.max_size_bytes must be positive".into()));
        }
        if u.allowed_types.is_empty() {
            return Err(MammoscanError::Config("upload.allowed_types must not be empty".into()));
        }
        if u.progress_tick_ms == 0 || u.progress_step == 0 {
            return Err(MammoscanError::Config("upload progress tick and step must be positive".into()));
        }
        if u.progress_ceiling > 100 {
            return Err(MammoscanError::Config("upload.progress_ceiling must be at most 100".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(MammoscanError::Config("api.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Client settings; `override_url` (flag or MAMMOSCAN_API_URL) wins over
    /// the configured origin and base path.
    pub fn client_config(&self, override_url: Option<&str>) -> ClientConfig {
        ClientConfig {
            base_url: resolve_base_url(&self.api.origin, &self.api.base_path, override_url),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    pub fn upload_settings(&self) -> UploadSettings {
        let u = &self.upload;
        UploadSettings {
            allowed_types: u.allowed_types.clone(),
            max_size_bytes: u.max_size_bytes,
            progress: ProgressSettings {
                tick: Duration::from_millis(u.progress_tick_ms),
                step: u.progress_step,
                ceiling: u.progress_ceiling,
            },
            completion_hold: Duration::from_millis(u.completion_hold_ms),
        }
    }
}
