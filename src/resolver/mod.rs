// src/resolver/mod.rs

//! Executable resolution with a per-session cache.
//!
//! Resolution is a PATH search plus a regular-file check. Successful
//! lookups are memoized for the lifetime of the resolver; entries are never
//! invalidated, since executables rarely move mid-session and a stale hit
//! simply fails at spawn time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::errors::{CmdRelayError, Result};

#[derive(Debug, Default)]
pub struct ExecutableResolver {
    cache: Mutex<HashMap<String, PathBuf>>,
}

impl ExecutableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a command name to a validated absolute path.
    ///
    /// - Already-absolute inputs skip the PATH search and are only checked
    ///   to be a regular file.
    /// - Relative inputs containing a separator resolve against
    ///   `directory`; the same name can point at different files from
    ///   different directories, so these are not cached.
    /// - Bare names are looked up on PATH; the hit must be a regular file.
    ///
    /// Fails with [`CmdRelayError::NotFound`] when no usable executable
    /// exists.
    pub fn resolve(&self, directory: &Path, command_name: &str) -> Result<PathBuf> {
        let as_path = Path::new(command_name);
        if as_path.is_absolute() {
            // Pre-resolved by the caller; no lookup, no caching.
            if as_path.is_file() {
                return Ok(as_path.to_path_buf());
            }
            return Err(CmdRelayError::NotFound(command_name.to_string()));
        }

        if command_name.contains('/') || command_name.contains(std::path::MAIN_SEPARATOR) {
            let candidate = directory.join(as_path);
            if candidate.is_file() {
                return Ok(candidate);
            }
            return Err(CmdRelayError::NotFound(command_name.to_string()));
        }

        {
            let cache = self.cache.lock().unwrap();
            if let Some(hit) = cache.get(command_name) {
                return Ok(hit.clone());
            }
        }

        let resolved = which::which(command_name)
            .map_err(|_| CmdRelayError::NotFound(command_name.to_string()))?;

        if !resolved.is_file() {
            return Err(CmdRelayError::NotFound(command_name.to_string()));
        }

        debug!(command = %command_name, path = %resolved.display(), "resolved executable");

        let mut cache = self.cache.lock().unwrap();
        cache.insert(command_name.to_string(), resolved.clone());

        Ok(resolved)
    }
}
