//! Application configuration
//!
//! Loaded from `config.json` in the application data directory. A missing file
//! is created with defaults; missing fields take their defaults.

use crate::catalog::CATALOG_FILE_NAME;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

/// File name of the configuration inside the app data directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    #[strum(to_string = "warn", serialize = "warning")]
    Warn,
    Error,
}

/// Launcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Interpreter every script is run with
    pub python_path: PathBuf,
    /// Directory holding the scripts and `scripts.json`
    pub scripts_dir: PathBuf,
    /// Log file, relative to the app data directory unless absolute
    pub log_file: PathBuf,
    pub log_level: LogLevel,
    /// Forces debug logging and mirrors logs to stderr in CLI mode
    pub debug_mode: bool,
    /// Rotate the log file once it grows past this many MiB
    pub max_log_size: u64,
    /// Number of rotated log files kept
    pub max_log_files: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            python_path: PathBuf::from("python"),
            scripts_dir: PathBuf::from("scripts"),
            log_file: PathBuf::from("logs/x-script.log"),
            log_level: LogLevel::Info,
            debug_mode: false,
            max_log_size: 10,
            max_log_files: 3,
        }
    }
}

impl AppConfig {
    /// Load `config.json` from `config_dir`, writing the defaults first if the
    /// file does not exist yet.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            let config = Self::default();
            fs::create_dir_all(config_dir).with_context(|| {
                format!("Failed to create config directory {:?}", config_dir)
            })?;
            config.save_to_file(&path)?;
            return Ok(config);
        }
        Self::load_from_file(&path)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Save configuration as `config.json` in `config_dir`
    pub fn save(&self, config_dir: &Path) -> Result<()> {
        self.save_to_file(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.python_path.as_os_str().is_empty() {
            anyhow::bail!("python_path must be specified");
        }
        if self.scripts_dir.as_os_str().is_empty() {
            anyhow::bail!("scripts_dir must be specified");
        }
        if self.log_file.as_os_str().is_empty() {
            anyhow::bail!("log_file must be specified");
        }
        Ok(())
    }

    /// Location of the script catalog
    pub fn catalog_path(&self) -> PathBuf {
        self.scripts_dir.join(CATALOG_FILE_NAME)
    }

    /// Location of the log file for app data directory `base_dir`
    pub fn log_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.log_file)
    }

    /// Rotation threshold in bytes
    pub fn max_log_bytes(&self) -> u64 {
        self.max_log_size.saturating_mul(1024 * 1024)
    }

    /// Level actually used, taking `debug_mode` into account
    pub fn effective_log_level(&self) -> LogLevel {
        if self.debug_mode {
            LogLevel::Debug
        } else {
            self.log_level
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("x-script");

        let config = AppConfig::load(&config_dir).unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(config_dir.join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            python_path: PathBuf::from("/usr/bin/python3"),
            debug_mode: true,
            log_level: LogLevel::Warn,
            ..AppConfig::default()
        };

        config.save(dir.path()).unwrap();

        assert_eq!(AppConfig::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"python_path": "python3", "window_width": 600}"#).unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();

        assert_eq!(config.python_path, PathBuf::from("python3"));
        assert_eq!(config.scripts_dir, PathBuf::from("scripts"));
        assert_eq!(config.max_log_files, 3);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{").unwrap();
        assert!(AppConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_interpreter() {
        let config = AppConfig {
            python_path: PathBuf::new(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::Error.to_string(), "error");

        let level: LogLevel = serde_json::from_str(r#""warning""#).unwrap();
        assert_eq!(level, LogLevel::Warn);
    }

    #[test]
    fn test_debug_mode_forces_debug_level() {
        let config = AppConfig {
            debug_mode: true,
            log_level: LogLevel::Error,
            ..AppConfig::default()
        };
        assert_eq!(config.effective_log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_paths() {
        let config = AppConfig::default();
        assert_eq!(config.catalog_path(), PathBuf::from("scripts/scripts.json"));
        assert_eq!(
            config.log_path(Path::new("/data")),
            PathBuf::from("/data/logs/x-script.log")
        );
        assert_eq!(config.max_log_bytes(), 10 * 1024 * 1024);
    }
}
