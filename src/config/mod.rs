//! Configuration module for nestql.
//!
//! Handles the settings file, environment variables and compiler defaults.

mod settings;

pub use settings::{
    expand_env_vars, CompilerSettings, SchemaSettings, Settings, SettingsError,
};
