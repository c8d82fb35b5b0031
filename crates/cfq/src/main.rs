use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod dispatch;
mod output;

use cli::Cli;
use commands::{CommandContext, CommandError};
use dispatch::Dispatch;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                // Compile failures already printed their result document.
                if !matches!(e, CommandError::Compile { .. }) {
                    let error_json = serde_json::json!({
                        "error": {
                            "code": error_code(&e),
                            "message": e.to_string(),
                        }
                    });
                    match serde_json::to_string_pretty(&error_json) {
                        Ok(text) => eprintln!("{text}"),
                        Err(_) => eprintln!("Error: {e}"),
                    }
                }
            } else {
                eprintln!("Error: {e}");
            }
            error_exit_code(&e)
        }
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` enables debug output and
/// `--quiet` limits logging to errors.
fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> commands::Result<()> {
    let ctx = CommandContext::from_cli(cli);
    Dispatch::from_cli(cli).execute(&ctx)
}

/// Returns the error code string for JSON output.
fn error_code(e: &CommandError) -> &'static str {
    match e {
        CommandError::Compile { .. } => "COMPILE_ERROR",
        CommandError::Hierarchy(_) => "HIERARCHY_ERROR",
        CommandError::Config(_) => "CONFIG_ERROR",
        CommandError::Io(_) => "IO_ERROR",
        CommandError::Json(_) => "JSON_ERROR",
    }
}

/// Returns the exit code for an error.
fn error_exit_code(e: &CommandError) -> ExitCode {
    match e {
        CommandError::Compile { .. } => ExitCode::from(1),
        CommandError::Hierarchy(_) => ExitCode::from(5),
        CommandError::Config(_) => ExitCode::from(5),
        CommandError::Io(_) => ExitCode::from(3),
        CommandError::Json(_) => ExitCode::from(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calfilter::ParseError;

    #[test]
    fn test_error_codes() {
        let compile = CommandError::Compile {
            message: "bad".to_string(),
            cause: Some(ParseError::MixedLogicalOperators),
        };
        assert_eq!(error_code(&compile), "COMPILE_ERROR");
        assert_eq!(
            error_code(&CommandError::Config("x".to_string())),
            "CONFIG_ERROR"
        );
        assert_eq!(
            error_code(&CommandError::Io(std::io::Error::other("disk"))),
            "IO_ERROR"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            error_exit_code(&CommandError::Config("x".to_string())),
            ExitCode::from(5)
        );
        assert_eq!(
            error_exit_code(&CommandError::Io(std::io::Error::other("disk"))),
            ExitCode::from(3)
        );
    }

    #[test]
    fn test_run_sort_with_temp_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = temp_dir.path().join("config.toml");
        let cli = Cli::parse_from([
            "cfq",
            "--quiet",
            "--config",
            config.to_str().unwrap(),
            "sort",
            "dtstart",
        ]);
        assert!(run(&cli).is_ok());
    }
}
