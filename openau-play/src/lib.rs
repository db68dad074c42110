//! # openau-play
//!
//! Command-line WAV player built on openau-core.
//!
//! - `audio`: cpal implementation of the core's audio backend
//! - `config`: CLI / environment / TOML settings resolution
//! - `logging`: tracing subscriber setup

pub mod audio;
pub mod config;
pub mod error;
pub mod logging;

pub use audio::CpalBackend;
pub use config::{CliOverrides, PlayerConfig, TomlConfig};
pub use error::{ConfigError, Error, Result};

/// Build identification captured by build.rs
pub fn build_info() -> String {
    format!(
        "{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    )
}
