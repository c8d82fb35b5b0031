//! Compiler configuration.
//!
//! Every field has a default, so an empty document (or a missing file at the
//! caller's discretion) yields a usable configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default limit on how deeply alias filters may nest.
const DEFAULT_MAX_ALIAS_DEPTH: usize = 16;

/// Default limit on expression length in bytes.
const DEFAULT_MAX_EXPRESSION_LENGTH: usize = 8192;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error during file read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML for this configuration.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Limits and defaults applied by [`FilterCompiler`](crate::filter::FilterCompiler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// How many levels of filters attached to collections may be compiled
    /// inside one another before the compile is abandoned.
    pub max_alias_depth: usize,

    /// Longest expression accepted, in bytes.
    pub max_expression_length: usize,

    /// Direction used for sort terms without `:asc` or `:desc`.
    pub default_sort_ascending: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_alias_depth: DEFAULT_MAX_ALIAS_DEPTH,
            max_expression_length: DEFAULT_MAX_EXPRESSION_LENGTH,
            default_sort_ascending: false,
        }
    }
}

impl CompilerConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
