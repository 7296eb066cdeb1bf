// src/config/model.rs

use serde::Deserialize;

/// Settings as read from a TOML file, before validation.
///
/// ```toml
/// default_timeout_secs = 30
/// max_output_mb = 50
/// debug = false
/// ```
///
/// All fields are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSettings {
    /// Seconds before a command with `Timeout::Default` is considered stuck.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Hard ceiling on buffered command output, in mebibytes.
    #[serde(default = "default_max_output_mb")]
    pub max_output_mb: u64,

    /// Extra debug logging of every dispatched command line.
    #[serde(default)]
    pub debug: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_output_mb() -> u64 {
    50
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            max_output_mb: default_max_output_mb(),
            debug: false,
        }
    }
}

/// Validated settings handed to the queue and worker at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub default_timeout_secs: u64,
    pub max_output_mb: u64,
    pub debug: bool,
}

impl Settings {
    pub(crate) fn new_unchecked(raw: RawSettings) -> Self {
        Self {
            default_timeout_secs: raw.default_timeout_secs,
            max_output_mb: raw.max_output_mb,
            debug: raw.debug,
        }
    }

    /// Output ceiling in bytes.
    pub fn max_output_bytes(&self) -> usize {
        (self.max_output_mb as usize) * 1024 * 1024
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new_unchecked(RawSettings::default())
    }
}
