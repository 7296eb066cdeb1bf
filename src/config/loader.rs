// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawSettings, Settings};
use crate::errors::Result;

/// Load settings from a given path and return the raw `RawSettings`.
///
/// This only performs TOML deserialization; it does **not** perform
/// semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawSettings = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load settings from path and run basic validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML (a missing file falls back to defaults).
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for nonsensical values (zero timeout, zero output ceiling).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let raw = if path.exists() {
        load_from_path(path)?
    } else {
        RawSettings::default()
    };
    let settings = Settings::try_from(raw)?;
    Ok(settings)
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `Cmdrelay.toml` in the current working
/// directory, but this function exists so you can later:
///
/// - Respect an env var (e.g. `CMDRELAY_CONFIG`).
/// - Look for multiple default locations.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Cmdrelay.toml")
}
