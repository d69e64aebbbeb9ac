//! Configuration management for narrmix.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//! - Environment overrides (`OUTPUT_BUCKET`, `MUSIC_BUCKET`, ...)
//!
//! # Example
//!
//! ```no_run
//! use narrmix_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/narrmix.toml");
//! config.load_or_create().unwrap();
//! config.apply_env_overrides();
//!
//! println!("Gap: {}s", config.settings().assembly.gap_seconds);
//!
//! config.settings_mut().assembly.strict_chunks = true;
//! config.update_section(ConfigSection::Assembly).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{
    ConfigError, ConfigManager, ConfigResult, ENV_FFMPEG, ENV_FFPROBE, ENV_MUSIC_BUCKET,
    ENV_OUTPUT_BUCKET,
};
pub use settings::{
    AssemblySettings, ConfigSection, EngineSettings, LoggingSettings, MixSettings, PathSettings,
    Settings, StorageSettings,
};
