//! Configuration module for AgroLink
//!
//! This module handles crate configuration:
//! - Link settings (device name, baud rate, timeouts, framing bound)
//! - Evaluation rule parameters (gas threshold, good moisture code)
//! - Pending store location and drain policy
//! - Cloud record provenance (device id, owner id)
//!
//! # Config Location
//!
//! The config file is `agrolink.toml`, loaded from an explicit path or the
//! platform-appropriate data directory under `com.agrobot.agrolink`:
//! - **Linux**: `~/.local/share/com.agrobot.agrolink/`
//! - **macOS**: `~/Library/Application Support/com.agrobot.agrolink/`
//! - **Windows**: `%APPDATA%\com.agrobot.agrolink\`
//!
//! # Example
//!
//! ```ignore
//! use agrolink::config::AppConfig;
//!
//! let config = AppConfig::load_or_default();
//! println!("expecting device '{}'", config.link.device_name);
//! config.save_default()?;
//! ```

use crate::error::{AgroLinkError, Result};
use crate::pending::DrainPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "com.agrobot.agrolink";

/// Config filename
pub const CONFIG_FILE: &str = "agrolink.toml";

/// Pending-store filename inside the app data directory
pub const PENDING_FILE: &str = "pending_readings.log";

/// Name of the paired radio module, as configured on the field unit
pub const DEFAULT_DEVICE_NAME: &str = "HC-06";

/// Default serial baud rate (HC-06 factory default)
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default blocking-read timeout in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 500;

/// Default cap on accumulated bytes for one unterminated line
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// Default gas threshold; the air is considered good above this level
pub const DEFAULT_GAS_THRESHOLD: i32 = 300;

/// Default "good" moisture code (0 = dry)
pub const DEFAULT_GOOD_MOISTURE: i32 = 0;

/// Default field-unit identifier attached to every record
pub const DEFAULT_DEVICE_ID: &str = "agrobot_main";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        AgroLinkError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            AgroLinkError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the default path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Sections ====================

/// Settings for the serial-over-radio link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Exact, case-sensitive name of the paired device to connect to
    pub device_name: String,

    /// Serial baud rate
    pub baud_rate: u32,

    /// Blocking-read timeout in milliseconds; a timeout is treated as
    /// "no data yet", not a failure
    pub read_timeout_ms: u64,

    /// Maximum accumulated bytes for one unterminated line before the
    /// framer discards its buffer
    pub max_line_len: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// Parameters of the fit-for-planting rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Gas level must be strictly above this threshold
    pub gas_threshold: i32,

    /// Moisture code that counts as suitable
    pub good_moisture: i32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            gas_threshold: DEFAULT_GAS_THRESHOLD,
            good_moisture: DEFAULT_GOOD_MOISTURE,
        }
    }
}

/// Settings for the local pending store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingConfig {
    /// Path of the pending log; defaults to the app data directory
    pub path: Option<PathBuf>,

    /// Delivery semantics used when draining queued readings
    pub policy: DrainPolicy,
}

impl PendingConfig {
    /// Resolve the pending-store path, falling back to the app data
    /// directory, then the working directory
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        app_data_dir()
            .map(|p| p.join(PENDING_FILE))
            .unwrap_or_else(|| PathBuf::from(PENDING_FILE))
    }
}

/// Provenance attached to every mirrored record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Field-unit identifier, constant per deployment
    pub device_id: String,

    /// Owner identity to attribute records to; `None` means unauthenticated
    pub owner_id: Option<String>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            owner_id: None,
        }
    }
}

// ==================== AppConfig ====================

/// Complete crate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial link settings
    pub link: LinkConfig,
    /// Evaluation rule parameters
    pub rule: RuleConfig,
    /// Pending store settings
    pub pending: PendingConfig,
    /// Cloud record provenance
    pub cloud: CloudConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AgroLinkError::Config(format!("Failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| AgroLinkError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        match config_path() {
            Some(path) if path.exists() => match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AgroLinkError::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AgroLinkError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }
        std::fs::write(path.as_ref(), content)
            .map_err(|e| AgroLinkError::Config(format!("Failed to write config: {}", e)))
    }

    /// Save to the default location
    pub fn save_default(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save(dir.join(CONFIG_FILE))
    }
}
