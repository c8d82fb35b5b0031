//! Command dispatch module for routing CLI commands to their handlers.

use crate::cli::{Cli, Commands, ConfigCommands, Shell};
use crate::commands::{self, CommandContext, CommandError, Result};

/// A CLI command resolved to its handler.
pub enum Dispatch<'a> {
    Parse(commands::parse::ParseOptions),
    Sort(&'a str),
    Config(&'a Option<ConfigCommands>),
    Completions(&'a Shell),
    Help,
}

impl<'a> Dispatch<'a> {
    /// Creates a dispatch from the parsed CLI.
    pub fn from_cli(cli: &'a Cli) -> Self {
        match &cli.command {
            Some(Commands::Parse {
                expr,
                hierarchy,
                explicit,
                source,
            }) => Self::Parse(commands::parse::ParseOptions {
                expr: expr.clone(),
                hierarchy: hierarchy.clone(),
                explicit: *explicit,
                source: source.clone(),
            }),
            Some(Commands::Sort { expr }) => Self::Sort(expr),
            Some(Commands::Config { command }) => Self::Config(command),
            Some(Commands::Completions { shell }) => Self::Completions(shell),
            None => Self::Help,
        }
    }

    /// Runs the handler.
    pub fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            Self::Parse(opts) => commands::parse::execute(ctx, opts),
            Self::Sort(expr) => commands::sort::execute(ctx, expr),
            Self::Config(command) => dispatch_config(ctx, command),
            Self::Completions(shell) => {
                commands::completions::execute(shell).map_err(CommandError::Io)
            }
            Self::Help => {
                if !ctx.quiet {
                    println!("cfq - calendar filter compiler");
                    println!("Use --help for usage information");
                }
                Ok(())
            }
        }
    }
}

/// Dispatch config subcommands.
fn dispatch_config(ctx: &CommandContext, command: &Option<ConfigCommands>) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::execute_show(ctx),
        Some(ConfigCommands::Set { key, value }) => {
            let opts = commands::config::ConfigSetOptions {
                key: key.clone(),
                value: value.clone(),
            };
            commands::config::execute_set(ctx, &opts)
        }
        Some(ConfigCommands::Path) => commands::config::execute_path(ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_dispatch_parse() {
        let cli = Cli::parse_from(["cfq", "parse", "due isdefined", "--hierarchy", "h.toml"]);
        match Dispatch::from_cli(&cli) {
            Dispatch::Parse(opts) => {
                assert_eq!(opts.expr, "due isdefined");
                assert_eq!(opts.hierarchy, Some(PathBuf::from("h.toml")));
                assert!(!opts.explicit);
            }
            _ => panic!("Expected Parse dispatch"),
        }
    }

    #[test]
    fn test_dispatch_sort_and_help() {
        let cli = Cli::parse_from(["cfq", "s", "due:asc"]);
        assert!(matches!(Dispatch::from_cli(&cli), Dispatch::Sort("due:asc")));

        let cli = Cli::parse_from(["cfq"]);
        assert!(matches!(Dispatch::from_cli(&cli), Dispatch::Help));
    }

    #[test]
    fn test_dispatch_config_defaults_to_show() {
        let cli = Cli::parse_from(["cfq", "config"]);
        assert!(matches!(Dispatch::from_cli(&cli), Dispatch::Config(None)));
    }
}
