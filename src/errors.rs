// src/errors.rs

//! Crate-wide error taxonomy and helpers.

use thiserror::Error;

use crate::types::CorrelationId;

#[derive(Error, Debug)]
pub enum CmdRelayError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Executable not found: {0}")]
    NotFound(String),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("Command exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Command timed out: {command_line}")]
    Timeout { command_line: String },

    #[error("Correlation id {0} is already tracked")]
    DuplicateId(CorrelationId),

    #[error("No process tracked for correlation id {0}")]
    UnknownId(CorrelationId),

    #[error("Bridge channel failed: {0}")]
    Boundary(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CmdRelayError>;
