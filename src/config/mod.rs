//! Configuration module for relsql.
//!
//! Compiler defaults and alias options loaded from TOML.

mod settings;

pub use settings::{CompilerSettings, Settings, SettingsError};
