//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the cfq CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// cfq - compile calendar filter and sort expressions
#[derive(Parser, Debug)]
#[command(name = "cfq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (show debug information)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file to use (default: ~/.config/cfq/config.toml, or $CFQ_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a filter expression and print its canonical form
    #[command(alias = "p")]
    Parse {
        /// Filter expression (e.g., 'entity_type="event" & summary~"standup"')
        expr: String,

        /// Hierarchy file with collections, categories and views (TOML)
        #[arg(long, value_name = "FILE")]
        hierarchy: Option<PathBuf>,

        /// Treat the selection as explicit (include hidden collections)
        #[arg(long)]
        explicit: bool,

        /// Label prefixed to error messages
        #[arg(long, default_value = "")]
        source: String,
    },

    /// Compile a sort expression
    #[command(alias = "s")]
    Sort {
        /// Sort expression (e.g., "dtstart:asc, summary")
        expr: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., compiler.max_alias_depth)
        key: String,

        /// Configuration value
        value: String,
    },

    /// Print config file path
    Path,
}

/// Shells supported for completions
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}
