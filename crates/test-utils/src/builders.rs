#![allow(dead_code)]

use std::path::PathBuf;

use cmdrelay::config::{RawSettings, Settings};
use cmdrelay::types::{CommandOptions, Timeout, TimeoutCheck};

/// Builder for `Settings` to simplify test setup.
pub struct SettingsBuilder {
    raw: RawSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawSettings::default(),
        }
    }

    pub fn default_timeout_secs(mut self, secs: u64) -> Self {
        self.raw.default_timeout_secs = secs;
        self
    }

    pub fn max_output_mb(mut self, mb: u64) -> Self {
        self.raw.max_output_mb = mb;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.raw.debug = debug;
        self
    }

    pub fn build(self) -> Settings {
        Settings::try_from(self.raw).expect("Failed to build valid settings from builder")
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `CommandOptions`.
pub struct CommandOptionsBuilder {
    options: CommandOptions,
}

impl CommandOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: CommandOptions::default(),
        }
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(dir.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.options.timeout = Timeout::AfterSecs(secs);
        self
    }

    pub fn no_timeout(mut self) -> Self {
        self.options.timeout = Timeout::Disabled;
        self
    }

    pub fn timeout_expected(mut self) -> Self {
        self.options.timeout_expected = true;
        self
    }

    pub fn timeout_check(mut self, check: TimeoutCheck) -> Self {
        self.options.timeout_check = Some(check);
        self
    }

    pub fn watch_progress(mut self) -> Self {
        self.options.watch_progress = true;
        self
    }

    pub fn build(self) -> CommandOptions {
        self.options
    }
}

impl Default for CommandOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
