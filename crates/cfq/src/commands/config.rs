//! Config command implementation.
//!
//! View and manage configuration settings.
//! Config file is located at ~/.config/cfq/config.toml.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use calfilter::CompilerConfig;
use directories::BaseDirs;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CommandContext, CommandError, Result};

/// Current config file version. Increment when making breaking changes to schema.
const CONFIG_VERSION: u32 = 1;

/// Environment variable overriding the config file location.
const CONFIG_ENV: &str = "CFQ_CONFIG";

/// Keys accepted by `cfq config set`.
const VALID_KEYS: &str = "hierarchy, compiler.max_alias_depth, compiler.max_expression_length, compiler.default_sort_ascending";

/// Configuration file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Config schema version for migrations.
    /// Defaults to current version when not present in file.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Hierarchy file used when `--hierarchy` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<PathBuf>,

    /// Compiler limits and defaults.
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Returns the current config version (used by serde default).
fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            hierarchy: None,
            compiler: CompilerConfig::default(),
        }
    }
}

/// Gets the config file path.
///
/// The resolution order is:
/// 1. `--config` command line flag
/// 2. `CFQ_CONFIG` environment variable
/// 3. `$XDG_CONFIG_HOME/cfq/config.toml`
/// 4. `~/.config/cfq/config.toml`
pub fn get_config_path(ctx: &CommandContext) -> Result<PathBuf> {
    if let Some(ref path) = ctx.config_path {
        return Ok(path.clone());
    }

    if let Ok(path) = env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config).join("cfq").join("config.toml"));
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("cfq").join("config.toml"))
        .ok_or_else(|| CommandError::Config("Could not determine config directory".to_string()))
}

/// Loads the configuration from disk. A missing file gives the defaults.
pub fn load_config(ctx: &CommandContext) -> Result<Config> {
    let path = get_config_path(ctx)?;
    load_config_from(&path)
}

fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| CommandError::Config(format!("Failed to read config: {}", e)))?;

    let mut config: Config = toml::from_str(&content)
        .map_err(|e| CommandError::Config(format!("Failed to parse config: {}", e)))?;

    config.version = CONFIG_VERSION;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Saves the configuration to disk.
fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            CommandError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| CommandError::Config(format!("Failed to serialize config: {}", e)))?;

    fs::write(path, content)
        .map_err(|e| CommandError::Config(format!("Failed to write config: {}", e)))?;

    Ok(())
}

/// Executes the config show command.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path(ctx)?;
    let config = load_config_from(&path)?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        let header = "Configuration";
        if ctx.use_colors {
            println!("{}\n", header.green().bold());
        } else {
            println!("{}\n", header);
        }

        println!("File: {}", path.display());
        println!("Exists: {}\n", path.exists());

        if let Some(ref hierarchy) = config.hierarchy {
            println!("hierarchy: {}\n", hierarchy.display());
        }

        println!("[compiler]");
        println!("  max_alias_depth: {}", config.compiler.max_alias_depth);
        println!(
            "  max_expression_length: {}",
            config.compiler.max_expression_length
        );
        println!(
            "  default_sort_ascending: {}",
            config.compiler.default_sort_ascending
        );
    }

    Ok(())
}

/// Options for the config set command.
pub struct ConfigSetOptions {
    /// Configuration key.
    pub key: String,
    /// Configuration value.
    pub value: String,
}

/// Executes the config set command.
pub fn execute_set(ctx: &CommandContext, opts: &ConfigSetOptions) -> Result<()> {
    let path = get_config_path(ctx)?;
    let mut config = load_config_from(&path)?;

    apply_setting(&mut config, &opts.key, &opts.value)?;
    save_config(&path, &config)?;

    if ctx.json_output {
        let output = serde_json::json!({
            "status": "success",
            "key": opts.key,
            "value": opts.value,
            "path": path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        println!("Set {} = {}", opts.key, opts.value);
    }

    Ok(())
}

fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "hierarchy" => config.hierarchy = Some(PathBuf::from(value)),
        "compiler.max_alias_depth" => config.compiler.max_alias_depth = parse_usize(value)?,
        "compiler.max_expression_length" => {
            let limit = parse_usize(value)?;
            if limit == 0 {
                return Err(CommandError::Config(
                    "max_expression_length must be greater than 0".to_string(),
                ));
            }
            config.compiler.max_expression_length = limit;
        }
        "compiler.default_sort_ascending" => {
            config.compiler.default_sort_ascending = parse_bool(value)?
        }
        _ => {
            return Err(CommandError::Config(format!(
                "Unknown config key '{}'. Valid keys: {}",
                key, VALID_KEYS
            )));
        }
    }
    Ok(())
}

/// Executes the config path command.
pub fn execute_path(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path(ctx)?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

/// Parses a boolean value from string.
fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(CommandError::Config(format!(
            "Invalid boolean value '{}'. Use true/false, yes/no, 1/0, or on/off",
            s
        ))),
    }
}

fn parse_usize(s: &str) -> Result<usize> {
    s.trim()
        .parse()
        .map_err(|_| CommandError::Config(format!("Invalid number '{}'", s)))
}
