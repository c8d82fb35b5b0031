//! Sort command implementation.

use calfilter::{FilterCompiler, MemoryHierarchy};

use super::config::load_config;
use super::{CommandContext, CommandError, Result};
use crate::output::{format_result_json, format_sort_terms_json, format_sort_terms_table};

/// Executes the sort command.
///
/// Sort expressions never consult the hierarchy, so an empty one is used.
pub fn execute(ctx: &CommandContext, expr: &str) -> Result<()> {
    let config = load_config(ctx)?;
    let hierarchy = MemoryHierarchy::new();
    let compiler = FilterCompiler::with_config(&hierarchy, config.compiler);

    let result = compiler.parse_sort(expr);
    if !result.ok {
        if ctx.json_output {
            println!("{}", format_result_json(&result)?);
        }
        return Err(CommandError::from(result));
    }
    let terms = result.sort_terms.unwrap_or_default();

    if ctx.json_output {
        println!("{}", format_sort_terms_json(&terms)?);
    } else if !ctx.quiet {
        print!("{}", format_sort_terms_table(&terms, ctx.use_colors));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ctx(temp_dir: &TempDir) -> CommandContext {
        CommandContext {
            json_output: false,
            use_colors: false,
            quiet: true,
            verbose: false,
            config_path: Some(temp_dir.path().join("config.toml")),
        }
    }

    #[test]
    fn test_execute_sort() {
        let temp_dir = TempDir::new().unwrap();
        assert!(execute(&ctx(&temp_dir), "dtstart:asc, summary").is_ok());
        assert!(execute(&ctx(&temp_dir), "   ").is_ok());
    }

    #[test]
    fn test_execute_sort_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = execute(&ctx(&temp_dir), "dtstart:sideways").unwrap_err();
        assert!(matches!(err, CommandError::Compile { cause: Some(_), .. }));
    }

    #[test]
    fn test_execute_sort_rejects_bad_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("config.toml"), "compiler = 3\n").unwrap();
        assert!(matches!(
            execute(&ctx(&temp_dir), "due"),
            Err(CommandError::Config(_))
        ));
    }
}
