// src/config/mod.rs

//! Startup configuration for the command core.
//!
//! Settings are read once from an optional TOML file (`Cmdrelay.toml` by
//! default) and never hot-reloaded. All fields have defaults, so a missing
//! file is not an error.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{RawSettings, Settings};
