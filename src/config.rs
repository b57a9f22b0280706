//! Configuration management for wasmboot
//!
//! TOML-based configuration with defaults and validation.
//! Location: ~/.wasmboot/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::candidates::{DEFAULT_CANDIDATES, DEFAULT_META_HINT};
use crate::errors::{BootError, Result};
use crate::loader::{DEFAULT_BINARY_SUFFIX, DEFAULT_SCRIPT_SUFFIX};
use crate::probe::DEFAULT_ALLOWED_CONTENT_TYPES;
use crate::render::{DEFAULT_ENHANCEMENTS, DEFAULT_ENTRY_POINT};

/// Complete configuration for wasmboot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub candidates: CandidatesConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub enhancements: EnhancementsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the bootstrap looks inside the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    pub mount_id: String,
    pub meta_hint_name: String,
}

/// Fixed candidates and naming rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesConfig {
    pub defaults: Vec<String>,
    pub script_suffix: String,
    pub binary_suffix: String,
}

/// Existence check settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub allowed_content_types: Vec<String>,
    pub timeout_sec: u64,
}

/// Optional libraries activated after a fallback render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementsConfig {
    pub libraries: Vec<String>,
    pub entry_point: String,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            mount_id: "root".to_string(),
            meta_hint_name: DEFAULT_META_HINT.to_string(),
        }
    }
}

impl Default for CandidatesConfig {
    fn default() -> Self {
        Self {
            defaults: DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            script_suffix: DEFAULT_SCRIPT_SUFFIX.to_string(),
            binary_suffix: DEFAULT_BINARY_SUFFIX.to_string(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_sec: 10,
        }
    }
}

impl Default for EnhancementsConfig {
    fn default() -> Self {
        Self {
            libraries: DEFAULT_ENHANCEMENTS.iter().map(|s| s.to_string()).collect(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BootError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| BootError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// `~/.wasmboot/config.toml`, when a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".wasmboot").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.page.mount_id.trim().is_empty() {
            return Err(BootError::ConfigError("mount_id must not be empty".to_string()));
        }

        if self.candidates.defaults.is_empty() {
            return Err(BootError::ConfigError(
                "at least one default candidate is required".to_string(),
            ));
        }

        if self.candidates.script_suffix.is_empty() || self.candidates.binary_suffix.is_empty() {
            return Err(BootError::ConfigError(
                "script_suffix and binary_suffix must not be empty".to_string(),
            ));
        }

        if self.probe.allowed_content_types.iter().all(|t| t.trim().is_empty()) {
            return Err(BootError::ConfigError(
                "allowed_content_types must contain at least one entry".to_string(),
            ));
        }

        if self.probe.timeout_sec == 0 {
            return Err(BootError::ConfigError(
                "timeout_sec must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(BootError::ConfigError(format!(
                    "Invalid log level: {}",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BootError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BootError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| BootError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Log directory, if file logging is configured
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.log_dir.as_deref().map(Self::expand_path)
    }
}
