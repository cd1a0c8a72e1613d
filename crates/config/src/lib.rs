//! Plugin settings: schema, loading, and validation.
//!
//! Settings files: `readonly.toml`, `readonly.yaml`, `readonly.yml` or
//! `readonly.json`, searched in `./` then the user config directory.
//!
//! `${ENV_VAR}` and `${ENV_VAR:-default}` are substituted in the raw file
//! before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{Format, config_dir, discover_and_load, load_settings, parse_settings},
    schema::{PluginSettings, SettingField},
    validate::{Diagnostic, Severity, ValidationResult},
};
