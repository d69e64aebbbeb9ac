//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::mix::{FadeBounds, MixParameters};
use crate::silence::{DEFAULT_GAP_SECONDS, DEFAULT_LEAD_IN_SECONDS};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Scratch and log directories.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Media engine executables and limits.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Narration assembly timing.
    #[serde(default)]
    pub assembly: AssemblySettings,

    /// Mix shaping parameters.
    #[serde(default)]
    pub mix: MixSettings,

    /// Object storage and publishing.
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Settings {
    /// Check values that serde cannot reject on its own.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.assembly.gap_seconds.is_finite() && self.assembly.gap_seconds > 0.0) {
            return Err(format!(
                "assembly.gap_seconds must be positive, got {}",
                self.assembly.gap_seconds
            ));
        }
        if !(self.assembly.lead_in_seconds.is_finite() && self.assembly.lead_in_seconds > 0.0) {
            return Err(format!(
                "assembly.lead_in_seconds must be positive, got {}",
                self.assembly.lead_in_seconds
            ));
        }
        if self.assembly.download_concurrency == 0 {
            return Err("assembly.download_concurrency must be at least 1".to_string());
        }
        self.mix.validate()?;
        if self.engine.timeout_secs == 0 {
            return Err("engine.timeout_secs must be at least 1".to_string());
        }
        if self.storage.presign_ttl_secs == 0 {
            return Err("storage.presign_ttl_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Path configuration for scratch files and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder for per-job scratch directories.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_temp_root() -> String {
    std::env::temp_dir()
        .join("narrmix")
        .to_string_lossy()
        .into_owned()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to job logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Write one log file per job under the logs folder.
    #[serde(default = "default_true")]
    pub job_logs: bool,

    /// Number of engine diagnostic lines to show in the failure tail.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Prefix job log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            job_logs: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

impl LoggingSettings {
    /// Per-job logger configuration derived from these settings.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            error_tail: self.error_tail as usize,
            show_timestamps: self.show_timestamps,
        }
    }
}

/// Media engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// ffmpeg executable (name on PATH or absolute path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// ffprobe executable (name on PATH or absolute path).
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Upper bound for any single engine invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EngineSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Narration assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblySettings {
    /// Silence inserted between consecutive fragments.
    #[serde(default = "default_gap_seconds")]
    pub gap_seconds: f64,

    /// Silence prepended to the assembled narration.
    #[serde(default = "default_lead_in_seconds")]
    pub lead_in_seconds: f64,

    /// Fail the job on a missing, empty or undownloadable chunk instead
    /// of logging it and continuing.
    #[serde(default)]
    pub strict_chunks: bool,

    /// Maximum number of chunk downloads in flight.
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,
}

fn default_gap_seconds() -> f64 {
    DEFAULT_GAP_SECONDS
}

fn default_lead_in_seconds() -> f64 {
    DEFAULT_LEAD_IN_SECONDS
}

fn default_download_concurrency() -> usize {
    4
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            gap_seconds: default_gap_seconds(),
            lead_in_seconds: default_lead_in_seconds(),
            strict_chunks: false,
            download_concurrency: default_download_concurrency(),
        }
    }
}

/// Mix shaping configuration. Defaults are the fixed broadcast values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixSettings {
    /// Gain applied to narration in both graphs.
    #[serde(default = "default_narration_volume")]
    pub narration_volume: f64,

    /// Narration high-pass cutoff when music is mixed in (Hz).
    #[serde(default = "default_music_highpass")]
    pub highpass_with_music_hz: u32,

    /// Narration high-pass cutoff for narration-only output (Hz).
    #[serde(default = "default_solo_highpass")]
    pub highpass_solo_hz: u32,

    /// Centre of the peaking EQ cut (Hz).
    #[serde(default = "default_eq_frequency")]
    pub eq_frequency_hz: u32,

    /// Q of the peaking EQ cut.
    #[serde(default = "default_eq_width")]
    pub eq_width_q: f64,

    /// Gain of the peaking EQ cut (dB).
    #[serde(default = "default_eq_gain")]
    pub eq_gain_db: f64,

    /// Gain applied to the music bed after the fade.
    #[serde(default = "default_music_volume")]
    pub music_volume: f64,

    /// Shortest allowed fade-out (seconds).
    #[serde(default = "default_fade_floor")]
    pub fade_floor_seconds: f64,

    /// Longest allowed fade-out (seconds).
    #[serde(default = "default_fade_cap")]
    pub fade_cap_seconds: f64,
}

fn default_narration_volume() -> f64 {
    MixParameters::default().narration_volume
}

fn default_music_highpass() -> u32 {
    MixParameters::default().highpass_with_music_hz
}

fn default_solo_highpass() -> u32 {
    MixParameters::default().highpass_solo_hz
}

fn default_eq_frequency() -> u32 {
    MixParameters::default().eq_frequency_hz
}

fn default_eq_width() -> f64 {
    MixParameters::default().eq_width_q
}

fn default_eq_gain() -> f64 {
    MixParameters::default().eq_gain_db
}

fn default_music_volume() -> f64 {
    MixParameters::default().music_volume
}

fn default_fade_floor() -> f64 {
    FadeBounds::default().floor
}

fn default_fade_cap() -> f64 {
    FadeBounds::default().cap
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            narration_volume: default_narration_volume(),
            highpass_with_music_hz: default_music_highpass(),
            highpass_solo_hz: default_solo_highpass(),
            eq_frequency_hz: default_eq_frequency(),
            eq_width_q: default_eq_width(),
            eq_gain_db: default_eq_gain(),
            music_volume: default_music_volume(),
            fade_floor_seconds: default_fade_floor(),
            fade_cap_seconds: default_fade_cap(),
        }
    }
}

impl MixSettings {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("mix.narration_volume", self.narration_volume),
            ("mix.music_volume", self.music_volume),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{} must be non-negative, got {}", name, value));
            }
        }
        if !(self.fade_floor_seconds.is_finite() && self.fade_floor_seconds > 0.0) {
            return Err(format!(
                "mix.fade_floor_seconds must be positive, got {}",
                self.fade_floor_seconds
            ));
        }
        if !(self.fade_cap_seconds.is_finite() && self.fade_cap_seconds >= self.fade_floor_seconds)
        {
            return Err(format!(
                "mix.fade_cap_seconds ({}) must not be below fade_floor_seconds ({})",
                self.fade_cap_seconds, self.fade_floor_seconds
            ));
        }
        Ok(())
    }

    /// Filter parameters for the mix graph builder.
    pub fn parameters(&self) -> MixParameters {
        MixParameters {
            narration_volume: self.narration_volume,
            highpass_with_music_hz: self.highpass_with_music_hz,
            highpass_solo_hz: self.highpass_solo_hz,
            eq_frequency_hz: self.eq_frequency_hz,
            eq_width_q: self.eq_width_q,
            eq_gain_db: self.eq_gain_db,
            music_volume: self.music_volume,
        }
    }

    /// Fade length bounds.
    pub fn fade_bounds(&self) -> FadeBounds {
        FadeBounds {
            floor: self.fade_floor_seconds,
            cap: self.fade_cap_seconds,
        }
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Root directory of the filesystem-backed store (one folder per bucket).
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Bucket receiving mixed output.
    #[serde(default)]
    pub output_bucket: String,

    /// Bucket holding music beds; falls back to the output bucket.
    #[serde(default)]
    pub music_bucket: Option<String>,

    /// Key prefix for published output.
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Lifetime of presigned download links.
    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_secs: u64,
}

fn default_storage_root() -> String {
    "storage".to_string()
}

fn default_output_prefix() -> String {
    "mixed/".to_string()
}

fn default_presign_ttl() -> u64 {
    3600
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            output_bucket: String::new(),
            music_bucket: None,
            output_prefix: default_output_prefix(),
            presign_ttl_secs: default_presign_ttl(),
        }
    }
}

impl StorageSettings {
    /// Bucket music references are resolved against.
    pub fn effective_music_bucket(&self) -> &str {
        self.music_bucket
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(&self.output_bucket)
    }

    pub fn presign_ttl(&self) -> Duration {
        Duration::from_secs(self.presign_ttl_secs)
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Engine,
    Assembly,
    Mix,
    Storage,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Engine,
        ConfigSection::Assembly,
        ConfigSection::Mix,
        ConfigSection::Storage,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Engine => "engine",
            ConfigSection::Assembly => "assembly",
            ConfigSection::Mix => "mix",
            ConfigSection::Storage => "storage",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Scratch and log directories",
            ConfigSection::Logging => "# Logging configuration",
            ConfigSection::Engine => "# ffmpeg / ffprobe invocation",
            ConfigSection::Assembly => "# Narration timing (seconds)",
            ConfigSection::Mix => "# Narration shaping and music bed levels",
            ConfigSection::Storage => "# Object storage and publishing",
        }
    }
}
