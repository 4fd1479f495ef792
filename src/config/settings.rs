//! TOML-based configuration for relsql.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! dialect = "mysql"
//! max_passes = 5
//! time_zone = "+01:00"
//!
//! [aliases]
//! prefix = "S"
//! separator = "_"
//! replacer = "_"
//! max_length = 30
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;

use crate::compiler::{AliasOptions, CompileOptions, DEFAULT_MAX_PASSES};
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub compiler: CompilerSettings,
    pub aliases: AliasOptions,
}

/// `[compiler]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Dialect used when the caller does not name one.
    pub dialect: Dialect,

    /// Upper bound of planning passes.
    pub max_passes: usize,

    /// Database time zone as `+HH:MM`.
    pub time_zone: Option<String>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_passes: DEFAULT_MAX_PASSES,
            time_zone: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `RELSQL_CONFIG`
    /// 2. `./relsql.toml`
    /// 3. `~/.config/relsql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("RELSQL_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("relsql.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("relsql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.compiler.max_passes == 0 {
            return Err(SettingsError::InvalidValue {
                field: "compiler.max_passes".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.aliases.prefix.is_empty() {
            return Err(SettingsError::InvalidValue {
                field: "aliases.prefix".into(),
                message: "must not be empty".into(),
            });
        }
        if ['.', '>', '<', '-', '(', ')', ':'].contains(&self.aliases.replacer) {
            return Err(SettingsError::InvalidValue {
                field: "aliases.replacer".into(),
                message: format!("'{}' is not allowed in an alias", self.aliases.replacer),
            });
        }
        self.time_zone()?;
        Ok(())
    }

    /// The configured time zone, if any.
    pub fn time_zone(&self) -> Result<Option<FixedOffset>, SettingsError> {
        let Some(zone) = &self.compiler.time_zone else {
            return Ok(None);
        };
        parse_offset(zone)
            .map(Some)
            .ok_or_else(|| SettingsError::InvalidValue {
                field: "compiler.time_zone".into(),
                message: format!("'{}' is not an offset like +01:00", zone),
            })
    }

    /// Compile options for `dialect`, or the configured default dialect.
    pub fn compile_options(&self, dialect: Option<Dialect>) -> Result<CompileOptions, SettingsError> {
        Ok(CompileOptions {
            dialect: dialect.unwrap_or(self.compiler.dialect),
            max_passes: self.compiler.max_passes,
            time_zone: self.time_zone()?,
            aliases: self.aliases.clone(),
        })
    }
}

/// `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`.
fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let zone = zone.trim();
    if zone.eq_ignore_ascii_case("z") || zone.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match zone.chars().next()? {
        '+' => (1, &zone[1..]),
        '-' => (-1, &zone[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
