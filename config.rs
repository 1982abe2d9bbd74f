//! Shred settings with environment variable support.
//!
//! This module provides [`Config`] for loading and validating shred settings
//! from JSON files and environment variables.
//!
//! ## Environment Variables
//!
//! - `SECURESHRED_CONFIG`: Config file path
//! - `SECURESHRED_PASSES`: Override number of overwrite passes
//! - `SECURESHRED_CHUNK_SIZE`: Override write chunk size in bytes
//! - `SECURESHRED_NO_RENAME`: Any non-empty value other than `0` disables renaming

use crate::error::ShredError;
use crate::pattern::{PassPlan, PassScheme};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const ENV_CONFIG_PATH: &str = "SECURESHRED_CONFIG";
pub const ENV_PASSES: &str = "SECURESHRED_PASSES";
pub const ENV_CHUNK_SIZE: &str = "SECURESHRED_CHUNK_SIZE";
pub const ENV_NO_RENAME: &str = "SECURESHRED_NO_RENAME";

/// Default write chunk (64KB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks above this are allowed but most likely a typo
const LARGE_CHUNK_WARN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub passes: usize,
    pub recursive: bool,
    pub rename_before_delete: bool,
    pub verify: bool,
    pub scheme: PassScheme,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            passes: 3,
            recursive: false,
            rename_before_delete: true,
            verify: false,
            scheme: PassScheme::Dod,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Load config from file path
    pub fn load(path: &str) -> Result<Self> {
        let s =
            fs::read_to_string(path).with_context(|| format!("reading config file {}", path))?;
        let mut config: Config =
            serde_json::from_str(&s).with_context(|| format!("parsing config file {}", path))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with environment variable overrides
    /// Priority: ENV vars > config file > defaults
    ///
    /// The result is not validated, so callers can layer their own overrides
    /// on top; call [`Config::validate`] once they are applied.
    pub fn load_with_env(path: Option<&str>) -> Result<Self> {
        let config_path = path
            .map(String::from)
            .or_else(|| env::var(ENV_CONFIG_PATH).ok());

        let mut config = match config_path {
            Some(ref p) if Path::new(p).exists() => {
                info!(path = p, "loading config from file");
                let s = fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p))?;
                serde_json::from_str(&s).with_context(|| format!("parsing config file {}", p))?
            }
            Some(ref p) => {
                warn!(path = p, "config file not found, using defaults");
                Config::default()
            }
            None => {
                debug!("using default configuration");
                Config::default()
            }
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(passes) = env::var(ENV_PASSES) {
            debug!(passes = %passes, "overriding passes from environment");
            self.passes = passes
                .trim()
                .parse()
                .with_context(|| format!("{} must be a non-negative integer", ENV_PASSES))?;
        }

        if let Ok(chunk) = env::var(ENV_CHUNK_SIZE) {
            debug!(chunk_size = %chunk, "overriding chunk_size from environment");
            self.chunk_size = chunk
                .trim()
                .parse()
                .with_context(|| format!("{} must be a non-negative integer", ENV_CHUNK_SIZE))?;
        }

        if let Ok(v) = env::var(ENV_NO_RENAME) {
            if !v.is_empty() && v != "0" {
                debug!("disabling rename from environment");
                self.rename_before_delete = false;
            }
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ShredError> {
        self.plan()?;

        if self.chunk_size == 0 {
            return Err(ShredError::config("chunk_size must be greater than 0"));
        }

        if self.chunk_size > LARGE_CHUNK_WARN {
            warn!(chunk_size = self.chunk_size, "very large chunk size, memory use per file equals chunk size");
        }

        Ok(())
    }

    /// Build the pass plan described by this config
    pub fn plan(&self) -> Result<PassPlan, ShredError> {
        PassPlan::with_scheme(self.scheme, self.passes)
    }
}
