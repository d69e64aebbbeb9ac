//! The on-disk settings file.
//!
//! Writes go through a sibling `.toml.tmp` file that is renamed into
//! place, so a crash never leaves a half-written config behind. Loading
//! with [`ConfigManager::load_or_create`] repairs the file: sections the
//! binary does not know are dropped and missing keys are written out
//! with their defaults.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table};

use super::settings::{ConfigSection, Settings};

pub const ENV_OUTPUT_BUCKET: &str = "OUTPUT_BUCKET";
pub const ENV_MUSIC_BUCKET: &str = "MUSIC_BUCKET";
pub const ENV_FFMPEG: &str = "NARRMIX_FFMPEG";
pub const ENV_FFPROBE: &str = "NARRMIX_FFPROBE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings plus the file they came from.
///
/// Edits through [`settings_mut`](Self::settings_mut) stay in memory
/// until [`save`](Self::save) or [`update_section`](Self::update_section).
pub struct ConfigManager {
    path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Start from defaults. Nothing is read until `load` or `load_or_create`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    pub fn temp_root(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.temp_root)
    }

    /// Read and validate the file without touching it.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound(self.path.clone()));
        }
        self.settings = parse_settings(&fs::read_to_string(&self.path)?)?;
        Ok(())
    }

    /// Read the file, writing defaults first when it does not exist and
    /// rewriting it when it needs repair.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.path.exists() {
            self.settings = Settings::default();
            return self.save();
        }

        let content = fs::read_to_string(&self.path)?;
        self.settings = parse_settings(&content)?;
        if self.needs_repair(&content.parse()?)? {
            self.save()?;
        }
        Ok(())
    }

    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        fs::create_dir_all(self.temp_root())?;
        fs::create_dir_all(self.logs_folder())?;
        Ok(())
    }

    /// Deployment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Deployment overrides from `lookup`. Blank values leave the setting alone.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let settings = &mut self.settings;

        if let Some(bucket) = value(ENV_OUTPUT_BUCKET) {
            settings.storage.output_bucket = bucket;
        }
        if let Some(bucket) = value(ENV_MUSIC_BUCKET) {
            settings.storage.music_bucket = Some(bucket);
        }
        if let Some(path) = value(ENV_FFMPEG) {
            settings.engine.ffmpeg_path = path;
        }
        if let Some(path) = value(ENV_FFPROBE) {
            settings.engine.ffprobe_path = path;
        }
    }

    pub fn save(&self) -> ConfigResult<()> {
        let rendered = self.render()?;
        self.write_atomically(&rendered)?;
        Ok(())
    }

    /// Rewrite one table from memory and keep every other table as it is on disk.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc = match fs::read_to_string(&self.path) {
            Ok(content) => content.parse::<DocumentMut>()?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => DocumentMut::new(),
            Err(e) => return Err(e.into()),
        };
        doc[section.table_name()] = Item::Table(self.section_table(section)?);
        self.write_atomically(&doc.to_string())?;
        Ok(())
    }

    /// The full file as `save` writes it, with a comment above each table.
    pub fn render(&self) -> ConfigResult<String> {
        let mut tables = Vec::with_capacity(ConfigSection::ALL.len());
        for section in ConfigSection::ALL {
            tables.push(format!(
                "{}\n[{}]\n{}",
                section.comment(),
                section.table_name(),
                self.section_body(section)?
            ));
        }
        Ok(format!(
            "# narrmix configuration\n# Regenerated on repair; `update_section` keeps other tables as written.\n\n{}",
            tables.join("\n")
        ))
    }

    /// A repair is due when the file has an unknown table or lacks a key.
    fn needs_repair(&self, doc: &DocumentMut) -> ConfigResult<bool> {
        let known: Vec<&str> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();
        if doc.iter().any(|(name, _)| !known.contains(&name)) {
            return Ok(true);
        }

        for section in ConfigSection::ALL {
            let Some(present) = doc.get(section.table_name()).and_then(Item::as_table) else {
                return Ok(true);
            };
            let expected = self.section_table(section)?;
            if expected.iter().any(|(key, _)| !present.contains_key(key)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn section_body(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let body = match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Engine => toml::to_string_pretty(&s.engine)?,
            ConfigSection::Assembly => toml::to_string_pretty(&s.assembly)?,
            ConfigSection::Mix => toml::to_string_pretty(&s.mix)?,
            ConfigSection::Storage => toml::to_string_pretty(&s.storage)?,
        };
        Ok(body)
    }

    fn section_table(&self, section: ConfigSection) -> ConfigResult<Table> {
        let doc: DocumentMut = self.section_body(section)?.parse()?;
        Ok(doc.as_table().clone())
    }

    fn write_atomically(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("toml.tmp");
        let mut file = fs::File::create(&staging)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staging, &self.path)
    }
}

fn parse_settings(content: &str) -> ConfigResult<Settings> {
    let settings: Settings = toml::from_str(content)?;
    settings.validate().map_err(ConfigError::Invalid)?;
    Ok(settings)
}
