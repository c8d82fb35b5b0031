//! Command implementations for the cfq CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod completions;
pub mod config;
pub mod parse;
pub mod sort;

use std::path::PathBuf;

use calfilter::filter::ParseError;

use crate::cli::Cli;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The expression did not compile.
    #[error("{message}")]
    Compile {
        /// Message from the compiler, prefixed with the source label.
        message: String,
        /// The underlying parse error.
        #[source]
        cause: Option<ParseError>,
    },

    /// Hierarchy file could not be loaded.
    #[error("hierarchy error: {0}")]
    Hierarchy(#[from] calfilter::hierarchy::HierarchyError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<calfilter::ParseResult> for CommandError {
    fn from(result: calfilter::ParseResult) -> Self {
        CommandError::Compile {
            message: result
                .message
                .unwrap_or_else(|| "expression did not compile".to_string()),
            cause: result.cause,
        }
    }
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Whether to be verbose.
    pub verbose: bool,
    /// Config file given on the command line.
    pub config_path: Option<PathBuf>,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            json_output: cli.json,
            use_colors: !cli.no_color,
            quiet: cli.quiet,
            verbose: cli.verbose,
            config_path: cli.config.clone(),
        }
    }
}
