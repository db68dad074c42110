//! Player configuration
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`OPENAU_DEVICE`, `OPENAU_BUFFER_FRAMES`,
//!    `OPENAU_CONFIG`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! The TOML file is `--config`, else `OPENAU_CONFIG`, else
//! `<config_dir>/openau/config.toml` if it exists. An explicitly named file
//! that cannot be read is an error; a missing default file is not.

use std::path::{Path, PathBuf};

use openau_core::{DeviceSelector, LatencyPreference, OutputOptions};
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

pub const ENV_DEVICE: &str = "OPENAU_DEVICE";
pub const ENV_BUFFER_FRAMES: &str = "OPENAU_BUFFER_FRAMES";
pub const ENV_CONFIG: &str = "OPENAU_CONFIG";

/// Contents of the TOML configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub output: OutputSection,
    pub logging: LoggingConfig,
}

/// `[output]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// "default", a device index, or a device name
    pub device: Option<String>,
    /// Frames per callback (device default if unset)
    pub buffer_frames: Option<u32>,
    pub latency: Option<LatencyPreference>,
}

/// `[logging]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub device: Option<String>,
    pub buffer_frames: Option<u32>,
    pub latency: Option<LatencyPreference>,
    pub log_level: Option<String>,
}

/// Fully resolved player settings
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub device: DeviceSelector,
    pub output: OutputOptions,
    pub log_level: String,
    /// File the TOML layer was read from, if any
    pub config_file: Option<PathBuf>,
}

impl PlayerConfig {
    /// Resolve against the process environment and the default config path.
    pub fn resolve(cli: &CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(cli, |key| std::env::var(key).ok(), default_config_path())
    }

    /// Resolve with an explicit environment lookup and default config path.
    pub fn resolve_with<F>(
        cli: &CliOverrides,
        env: F,
        default_config: Option<PathBuf>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (file, config_file) = match cli.config.clone().or_else(|| env(ENV_CONFIG).map(PathBuf::from)) {
            Some(path) => (TomlConfig::load(&path)?, Some(path)),
            None => match default_config.filter(|path| path.exists()) {
                Some(path) => (TomlConfig::load(&path)?, Some(path)),
                None => (TomlConfig::default(), None),
            },
        };
        if let Some(path) = &config_file {
            debug!("Loaded configuration from {}", path.display());
        }

        let device = cli
            .device
            .clone()
            .or_else(|| env(ENV_DEVICE))
            .or_else(|| file.output.device.clone())
            .map(|s| s.parse::<DeviceSelector>().unwrap_or_default())
            .unwrap_or_default();

        let buffer_frames = match (cli.buffer_frames, env(ENV_BUFFER_FRAMES)) {
            (Some(frames), _) => Some(frames),
            (None, Some(raw)) => Some(parse_buffer_frames(&raw)?),
            (None, None) => file.output.buffer_frames,
        };
        if let Some(0) = buffer_frames {
            return Err(invalid("buffer_frames", "0", "must be at least 1"));
        }

        let latency = cli.latency.or(file.output.latency).unwrap_or_default();

        let log_level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| file.logging.level.clone());

        Ok(Self {
            device,
            output: OutputOptions {
                latency,
                frames_per_buffer: buffer_frames,
            },
            log_level,
            config_file,
        })
    }
}

/// `<config_dir>/openau/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("openau").join("config.toml"))
}

fn parse_buffer_frames(raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid("buffer_frames", raw, &e.to_string()))
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
